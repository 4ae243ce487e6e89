//! Precomputed 2D surface heights over a world footprint.
//!
//! Chunks built from the same heightmap read identical values at identical
//! world columns, which is what makes their shared faces agree exactly.

use crate::error::TerrainError;
use crate::noise::{OctaveParams, SimplexNoise};

/// Surface heights (in voxels) for a rectangle of world columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Heightmap {
    origin_x: i32,
    origin_z: i32,
    width: usize,
    depth: usize,
    heights: Vec<f32>,
}

impl Heightmap {
    /// Wraps raw samples laid out `x + z * width`, starting at world column
    /// `(origin_x, origin_z)`.
    pub fn new(
        origin_x: i32,
        origin_z: i32,
        width: usize,
        depth: usize,
        heights: Vec<f32>,
    ) -> Result<Self, TerrainError> {
        let expected = width * depth;
        if heights.len() != expected {
            return Err(TerrainError::HeightmapShape {
                width,
                depth,
                expected,
                actual: heights.len(),
            });
        }
        Ok(Self {
            origin_x,
            origin_z,
            width,
            depth,
            heights,
        })
    }

    /// A constant-height heightmap.
    pub fn flat(origin_x: i32, origin_z: i32, width: usize, depth: usize, height: f32) -> Self {
        Self {
            origin_x,
            origin_z,
            width,
            depth,
            heights: vec![height; width * depth],
        }
    }

    /// Samples fractal noise once over the footprint:
    /// `height = multi_octave * amplitude + base_height`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_noise(
        noise: &SimplexNoise,
        params: &OctaveParams,
        amplitude: f64,
        base_height: f64,
        origin_x: i32,
        origin_z: i32,
        width: usize,
        depth: usize,
    ) -> Result<Self, TerrainError> {
        params.validate()?;
        let mut heights = Vec::with_capacity(width * depth);
        for z in 0..depth {
            for x in 0..width {
                let wx = (origin_x as i64 + x as i64) as f64;
                let wz = (origin_z as i64 + z as i64) as f64;
                let n = noise.multi_octave(wx, 0.0, wz, params) as f64;
                heights.push((n * amplitude + base_height) as f32);
            }
        }
        Ok(Self {
            origin_x,
            origin_z,
            width,
            depth,
            heights,
        })
    }

    /// Height at a world column, or `None` outside the footprint.
    pub fn get(&self, world_x: i32, world_z: i32) -> Option<f32> {
        let lx = world_x as i64 - self.origin_x as i64;
        let lz = world_z as i64 - self.origin_z as i64;
        if lx < 0 || lz < 0 || lx >= self.width as i64 || lz >= self.depth as i64 {
            return None;
        }
        Some(self.heights[lx as usize + lz as usize * self.width])
    }

    /// Columns along X.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Columns along Z.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// World column of the first sample.
    pub fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_z)
    }
}
