//! Chunk generation from column heights.
//!
//! Each `(x, z)` column gets one surface height, either from a supplied
//! [`Heightmap`] or from fractal noise, and the column is then filled by the
//! layering rule in [`layer_voxel`]. Columns are independent, so generation
//! runs data-parallel across z-slabs of the buffer.

use std::sync::Arc;

use rayon::prelude::*;
use strata_voxel::{ChunkCoord, VoxelBuffer, VoxelType, largest_valid_chunk_size};

use crate::error::TerrainError;
use crate::heightmap::Heightmap;
use crate::noise::{OctaveParams, SimplexNoise};

/// Per-column shaping parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnParams {
    /// Fractal noise settings for the noise-driven strategy.
    pub octaves: OctaveParams,
    /// Height variation in voxels.
    pub amplitude: f64,
    /// Mean surface height in voxels.
    pub base_height: f64,
    /// Grass layers at the top of each column.
    pub grass_thickness: u32,
    /// Dirt layers below the grass.
    pub dirt_thickness: u32,
    /// Air at or below this height becomes water.
    pub water_level: Option<i32>,
    /// Selects the heightmap-driven strategy when present.
    pub heightmap: Option<Arc<Heightmap>>,
}

impl Default for ColumnParams {
    fn default() -> Self {
        Self {
            octaves: OctaveParams::default(),
            amplitude: 24.0,
            base_height: 32.0,
            grass_thickness: 1,
            dirt_thickness: 3,
            water_level: None,
            heightmap: None,
        }
    }
}

/// Voxel type at world height `y` in a column whose surface is at `surface`.
///
/// Grass occupies `(surface - grass, surface]`, dirt the next `dirt` layers
/// below, stone everything under that. Above the surface is water up to the
/// water level, then air.
#[inline]
pub fn layer_voxel(y: i32, surface: i32, params: &ColumnParams) -> VoxelType {
    if y > surface {
        return match params.water_level {
            Some(level) if y <= level => VoxelType::Water,
            _ => VoxelType::Air,
        };
    }
    let depth = (surface - y) as i64;
    let grass = params.grass_thickness as i64;
    let dirt = params.dirt_thickness as i64;
    if depth < grass {
        VoxelType::Grass
    } else if depth < grass + dirt {
        VoxelType::Dirt
    } else {
        VoxelType::Stone
    }
}

/// A validated generator for one seed and chunk size.
///
/// Construction performs every parameter check, so [`generate`](Self::generate)
/// itself cannot fail.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    noise: SimplexNoise,
    size: usize,
    params: ColumnParams,
}

impl TerrainGenerator {
    /// Validates parameters and builds the seed's permutation table.
    pub fn new(seed: u64, chunk_size: usize, params: ColumnParams) -> Result<Self, TerrainError> {
        if chunk_size == 0 {
            return Err(TerrainError::ZeroChunkSize);
        }
        if !chunk_size.is_power_of_two() {
            return Err(TerrainError::NonPowerOfTwo(chunk_size));
        }
        let max = largest_valid_chunk_size();
        if chunk_size > max {
            return Err(TerrainError::ChunkTooLarge {
                size: chunk_size,
                max,
            });
        }
        params.octaves.validate()?;
        Ok(Self {
            noise: SimplexNoise::new(seed),
            size: chunk_size,
            params,
        })
    }

    /// World seed.
    pub fn seed(&self) -> u64 {
        self.noise.seed()
    }

    /// Chunk side length.
    pub fn chunk_size(&self) -> usize {
        self.size
    }

    /// Column parameters.
    pub fn params(&self) -> &ColumnParams {
        &self.params
    }

    /// Surface height of a world column (voxel units, floored).
    pub fn surface_height(&self, world_x: i32, world_z: i32) -> i32 {
        let height = self
            .params
            .heightmap
            .as_ref()
            .and_then(|map| map.get(world_x, world_z).map(f64::from))
            .unwrap_or_else(|| {
                let n = self.noise.multi_octave(
                    world_x as f64,
                    0.0,
                    world_z as f64,
                    &self.params.octaves,
                ) as f64;
                n * self.params.amplitude + self.params.base_height
            });
        height.floor() as i32
    }

    /// Fills the buffer for one chunk.
    pub fn generate(&self, coord: ChunkCoord) -> VoxelBuffer {
        let size = self.size;
        let min = coord.min_voxel(size);
        let mut buffer = VoxelBuffer::new_air(size);

        buffer
            .as_mut_slice()
            .par_chunks_mut(size * size)
            .enumerate()
            .for_each(|(z, slab)| {
                let wz = min.z + z as i32;
                for x in 0..size {
                    let surface = self.surface_height(min.x + x as i32, wz);
                    for y in 0..size {
                        slab[x + y * size] = layer_voxel(min.y + y as i32, surface, &self.params);
                    }
                }
            });

        buffer
    }
}

/// Generates the buffer for `coord`, failing fast on bad parameters.
pub fn generate(
    seed: u64,
    coord: ChunkCoord,
    chunk_size: usize,
    params: &ColumnParams,
) -> Result<VoxelBuffer, TerrainError> {
    Ok(TerrainGenerator::new(seed, chunk_size, params.clone())?.generate(coord))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_params(height: f32) -> ColumnParams {
        ColumnParams {
            heightmap: Some(Arc::new(Heightmap::flat(-64, -64, 128, 128, height))),
            ..ColumnParams::default()
        }
    }

    #[test]
    fn test_flat_heightmap_layers() {
        let params = flat_params(32.0);
        // Chunk y=2 spans world y 32..48, chunk y=1 spans 16..32.
        let top = generate(1, ChunkCoord::new(0, 2, 0), 16, &params).unwrap();
        let below = generate(1, ChunkCoord::new(0, 1, 0), 16, &params).unwrap();

        for z in 0..16 {
            for x in 0..16 {
                assert_eq!(top.get(x, 0, z), VoxelType::Grass, "y=32 should be grass");
                for y in 1..16 {
                    assert_eq!(top.get(x, y, z), VoxelType::Air, "y={} should be air", 32 + y);
                }
                for y in 13..16 {
                    assert_eq!(below.get(x, y, z), VoxelType::Dirt, "y={} should be dirt", 16 + y);
                }
                for y in 0..13 {
                    assert_eq!(below.get(x, y, z), VoxelType::Stone, "y={} should be stone", 16 + y);
                }
            }
        }
    }

    #[test]
    fn test_water_fills_above_surface() {
        let mut params = flat_params(10.0);
        params.water_level = Some(12);
        let buf = generate(1, ChunkCoord::ZERO, 16, &params).unwrap();
        assert_eq!(buf.get(0, 10, 0), VoxelType::Grass);
        assert_eq!(buf.get(0, 11, 0), VoxelType::Water);
        assert_eq!(buf.get(0, 12, 0), VoxelType::Water);
        assert_eq!(buf.get(0, 13, 0), VoxelType::Air);
    }

    #[test]
    fn test_same_seed_same_coordinate_identical() {
        let params = ColumnParams::default();
        let coord = ChunkCoord::new(3, 1, -7);
        let a = TerrainGenerator::new(42, 16, params.clone()).unwrap();
        let b = TerrainGenerator::new(42, 16, params).unwrap();
        assert_eq!(a.generate(coord), b.generate(coord));
        assert_eq!(a.generate(coord), a.generate(coord));
    }

    #[test]
    fn test_noise_terrain_has_surface() {
        let params = ColumnParams {
            amplitude: 4.0,
            base_height: 32.0,
            ..ColumnParams::default()
        };
        // Surface stays within 28..=36, so y=16 is buried and y=47 is open sky.
        let below = generate(9, ChunkCoord::new(0, 1, 0), 16, &params).unwrap();
        let above = generate(9, ChunkCoord::new(0, 2, 0), 16, &params).unwrap();
        for z in 0..16 {
            for x in 0..16 {
                assert_eq!(below.get(x, 0, z), VoxelType::Stone);
                assert_eq!(above.get(x, 15, z), VoxelType::Air);
            }
        }
    }

    fn shared_face_agreement(left: &VoxelBuffer, right: &VoxelBuffer) -> f64 {
        let size = left.size();
        let mut same = 0;
        for z in 0..size {
            for y in 0..size {
                if left.get(size - 1, y, z) == right.get(0, y, z) {
                    same += 1;
                }
            }
        }
        same as f64 / (size * size) as f64
    }

    #[test]
    fn test_flat_heightmap_border_exact() {
        let params = flat_params(20.0);
        let left = generate(5, ChunkCoord::new(0, 1, 0), 16, &params).unwrap();
        let right = generate(5, ChunkCoord::new(1, 1, 0), 16, &params).unwrap();
        assert_eq!(shared_face_agreement(&left, &right), 1.0);
    }

    #[test]
    fn test_heightmap_border_continuity() {
        let noise = SimplexNoise::new(21);
        let octaves = OctaveParams {
            octaves: 1,
            ..OctaveParams::default()
        };
        let map = Heightmap::from_noise(&noise, &octaves, 4.0, 8.0, 0, 0, 32, 16).unwrap();
        let params = ColumnParams {
            heightmap: Some(Arc::new(map)),
            ..ColumnParams::default()
        };
        let left = generate(21, ChunkCoord::new(0, 0, 0), 16, &params).unwrap();
        let right = generate(21, ChunkCoord::new(1, 0, 0), 16, &params).unwrap();
        let agreement = shared_face_agreement(&left, &right);
        assert!(agreement >= 0.95, "only {:.1}% of border voxels agree", agreement * 100.0);
    }

    #[test]
    fn test_heightmap_mode_ignores_local_noise() {
        // Inside the footprint the array is the only input, so generators
        // with different seeds still agree voxel for voxel.
        let params = flat_params(7.0);
        let a = TerrainGenerator::new(1, 16, params.clone()).unwrap();
        let b = TerrainGenerator::new(2, 16, params).unwrap();
        let coord = ChunkCoord::new(-2, 0, 3);
        assert_eq!(a.generate(coord), b.generate(coord));
    }

    #[test]
    fn test_columns_outside_heightmap_fall_back_to_noise() {
        let params = ColumnParams {
            heightmap: Some(Arc::new(Heightmap::flat(0, 0, 16, 16, 5.0))),
            ..ColumnParams::default()
        };
        let with_map = TerrainGenerator::new(3, 16, params.clone()).unwrap();
        let noise_only = TerrainGenerator::new(
            3,
            16,
            ColumnParams {
                heightmap: None,
                ..params
            },
        )
        .unwrap();
        assert_eq!(with_map.surface_height(4, 4), 5);
        assert_eq!(with_map.surface_height(100, 4), noise_only.surface_height(100, 4));
    }

    #[test]
    fn test_zero_chunk_size_fails_fast() {
        assert_eq!(
            generate(1, ChunkCoord::ZERO, 0, &ColumnParams::default()),
            Err(TerrainError::ZeroChunkSize)
        );
    }

    #[test]
    fn test_non_power_of_two_fails() {
        assert_eq!(
            generate(1, ChunkCoord::ZERO, 12, &ColumnParams::default()),
            Err(TerrainError::NonPowerOfTwo(12))
        );
    }

    #[test]
    fn test_degenerate_octaves_fail() {
        let mut params = ColumnParams::default();
        params.octaves.octaves = 0;
        assert_eq!(
            generate(1, ChunkCoord::ZERO, 16, &params),
            Err(TerrainError::DegenerateOctaves)
        );
    }

    #[test]
    fn test_oversized_chunk_fails() {
        assert!(matches!(
            generate(1, ChunkCoord::ZERO, 64, &ColumnParams::default()),
            Err(TerrainError::ChunkTooLarge { size: 64, max: 16 })
        ));
    }
}
