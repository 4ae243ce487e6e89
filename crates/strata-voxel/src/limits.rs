//! Vertex-ceiling arithmetic for chunk sizing.
//!
//! Every exposed face needs one quad in the worst case (no two neighbors can
//! merge). Along one axis a chunk of side `S` has `S - 1` interior interfaces
//! per row plus two boundary faces, and each interface exposes at most one
//! face, so the axis contributes at most `S³ + S²` faces. Three axes give
//! `3S³ + 3S²` quads, four vertices each.

use static_assertions::const_assert;

/// Renderer index-width ceiling on vertices per chunk mesh.
pub const MAX_VERTICES_PER_CHUNK: usize = 65_535;

/// Default chunk side length in voxels.
pub const DEFAULT_CHUNK_SIZE: usize = 16;

/// Upper bound on greedy-mesh quads for a chunk of side `size`.
pub const fn worst_case_quad_count(size: usize) -> usize {
    3 * size * size * size + 3 * size * size
}

/// Upper bound on greedy-mesh vertices for a chunk of side `size`.
pub const fn worst_case_vertex_count(size: usize) -> usize {
    4 * worst_case_quad_count(size)
}

/// Largest power-of-two chunk size whose worst case fits the ceiling.
pub const fn largest_valid_chunk_size() -> usize {
    let mut size = 1;
    while worst_case_vertex_count(size * 2) <= MAX_VERTICES_PER_CHUNK {
        size *= 2;
    }
    size
}

const_assert!(worst_case_vertex_count(DEFAULT_CHUNK_SIZE) <= MAX_VERTICES_PER_CHUNK);
const_assert!(DEFAULT_CHUNK_SIZE.is_power_of_two());
