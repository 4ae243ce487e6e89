//! Chunk-space coordinates and world-to-voxel conversion.

use std::fmt;
use std::ops::{Add, Sub};

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Position of a chunk in chunk space (not world units).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X in chunk units.
    pub x: i32,
    /// Y in chunk units.
    pub y: i32,
    /// Z in chunk units.
    pub z: i32,
}

/// A voxel position inside a chunk, each component in `0..size`.
pub type LocalPos = (usize, usize, usize);

impl ChunkCoord {
    /// The chunk at the origin.
    pub const ZERO: ChunkCoord = ChunkCoord { x: 0, y: 0, z: 0 };

    /// Creates a coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Neighbor coordinate at the given offset.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Squared Euclidean distance in chunk units.
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance in chunk units.
    pub fn distance(self, other: ChunkCoord) -> f32 {
        (self.distance_sq(other) as f64).sqrt() as f32
    }

    /// Manhattan distance in chunk units.
    pub fn manhattan(self, other: ChunkCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }

    /// The chunk containing a world-space position.
    pub fn from_world(pos: Vec3, chunk_world_size: f32) -> Self {
        let c = (pos / chunk_world_size).floor();
        Self::new(c.x as i32, c.y as i32, c.z as i32)
    }

    /// World-space position of this chunk's minimum corner.
    pub fn origin_world(self, chunk_world_size: f32) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32) * chunk_world_size
    }

    /// Center of this chunk in world space.
    pub fn center_world(self, chunk_world_size: f32) -> Vec3 {
        self.origin_world(chunk_world_size) + Vec3::splat(chunk_world_size * 0.5)
    }

    /// Global voxel coordinate of this chunk's minimum corner.
    pub fn min_voxel(self, size: usize) -> IVec3 {
        IVec3::new(self.x, self.y, self.z) * size as i32
    }
}

impl Add for ChunkCoord {
    type Output = ChunkCoord;

    fn add(self, rhs: ChunkCoord) -> ChunkCoord {
        self.offset(rhs.x, rhs.y, rhs.z)
    }
}

impl Sub for ChunkCoord {
    type Output = ChunkCoord;

    fn sub(self, rhs: ChunkCoord) -> ChunkCoord {
        self.offset(-rhs.x, -rhs.y, -rhs.z)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Global voxel containing a world-space position.
pub fn world_to_voxel(pos: Vec3, voxel_world_size: f32) -> IVec3 {
    (pos / voxel_world_size).floor().as_ivec3()
}

/// Splits a global voxel coordinate into its chunk and local position.
///
/// Negative coordinates round toward negative infinity, so voxel `-1`
/// is local `size - 1` of chunk `-1`.
pub fn split_voxel(voxel: IVec3, size: usize) -> (ChunkCoord, LocalPos) {
    let s = size as i32;
    let chunk = ChunkCoord::new(
        voxel.x.div_euclid(s),
        voxel.y.div_euclid(s),
        voxel.z.div_euclid(s),
    );
    let local = (
        voxel.x.rem_euclid(s) as usize,
        voxel.y.rem_euclid(s) as usize,
        voxel.z.rem_euclid(s) as usize,
    );
    (chunk, local)
}
