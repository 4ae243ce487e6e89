//! Geometry hand-off to the render and physics adapters.

use std::sync::Arc;

use glam::Vec3;
use strata_mesh::{ChunkGeometry, CollisionMesh};
use strata_voxel::ChunkCoord;

/// World placement of a chunk's chunk-local geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkTransform {
    /// World-space position of the chunk's minimum corner.
    pub origin: Vec3,
    /// World units per voxel.
    pub scale: f32,
}

impl ChunkTransform {
    /// Transform for `coord` with chunks of `chunk_size` voxels of `voxel_world_size`.
    pub fn for_chunk(coord: ChunkCoord, chunk_size: usize, voxel_world_size: f32) -> Self {
        Self {
            origin: coord.origin_world(chunk_size as f32 * voxel_world_size),
            scale: voxel_world_size,
        }
    }

    /// Maps a chunk-local vertex position to world space.
    pub fn apply(&self, local: [f32; 3]) -> Vec3 {
        self.origin + Vec3::from(local) * self.scale
    }
}

/// What changed for a chunk since the last drain.
#[derive(Clone, Debug)]
pub enum ChunkEvent {
    /// The chunk became resident with its first meshes.
    Activated {
        /// The chunk.
        coord: ChunkCoord,
        /// Placement of its geometry.
        transform: ChunkTransform,
        /// Render geometry.
        geometry: Arc<ChunkGeometry>,
        /// Collision geometry.
        collision: Option<Arc<CollisionMesh>>,
    },
    /// Render geometry was rebuilt after an edit.
    Updated {
        /// The chunk.
        coord: ChunkCoord,
        /// Placement of its geometry.
        transform: ChunkTransform,
        /// Replacement render geometry.
        geometry: Arc<ChunkGeometry>,
    },
    /// Collision geometry was rebuilt after an edit.
    CollisionUpdated {
        /// The chunk.
        coord: ChunkCoord,
        /// Placement of its geometry.
        transform: ChunkTransform,
        /// Replacement collision geometry.
        collision: Arc<CollisionMesh>,
    },
    /// The chunk left residency; drop its GPU buffers and collider.
    Unloaded {
        /// The chunk.
        coord: ChunkCoord,
    },
}

impl ChunkEvent {
    /// The chunk the event is about.
    pub fn coord(&self) -> ChunkCoord {
        match self {
            Self::Activated { coord, .. }
            | Self::Updated { coord, .. }
            | Self::CollisionUpdated { coord, .. }
            | Self::Unloaded { coord } => *coord,
        }
    }
}
