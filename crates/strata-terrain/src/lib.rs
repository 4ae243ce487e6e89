//! Procedural terrain: seeded simplex noise, heightmap input, and the chunk
//! generator that turns either into dense voxel buffers.

mod async_generation;
mod error;
mod generator;
mod heightmap;
mod noise;
mod seed;

pub use async_generation::{AsyncChunkGenerator, GeneratedChunk, GenerationTask};
pub use error::TerrainError;
pub use generator::{ColumnParams, TerrainGenerator, generate, layer_voxel};
pub use heightmap::Heightmap;
pub use noise::{OctaveParams, SimplexNoise, multi_octave, sample};
pub use seed::{buffer_fingerprint, noise_rng};
