//! Voxel storage primitives: voxel types, chunk coordinates, dense chunk
//! buffers, edit deltas, and the binary chunk codec used by the cache tiers.

pub mod buffer;
pub mod coord;
pub mod limits;
pub mod serial;
pub mod voxel_type;

pub use buffer::{VoxelBuffer, VoxelDelta, apply_deltas};
pub use coord::{ChunkCoord, LocalPos, split_voxel, world_to_voxel};
pub use limits::{
    DEFAULT_CHUNK_SIZE, MAX_VERTICES_PER_CHUNK, largest_valid_chunk_size, worst_case_quad_count,
    worst_case_vertex_count,
};
pub use serial::{ChunkSerError, DecodedChunk, decode_chunk, encode_chunk};
pub use voxel_type::VoxelType;
