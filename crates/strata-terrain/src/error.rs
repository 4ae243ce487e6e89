//! Terrain configuration errors.

/// Raised before any buffer is allocated when generation parameters are out of range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TerrainError {
    /// Chunk side length of zero.
    #[error("chunk size must be nonzero")]
    ZeroChunkSize,
    /// Chunk side length that is not a power of two.
    #[error("chunk size {0} is not a power of two")]
    NonPowerOfTwo(usize),
    /// Chunk side length whose worst-case mesh exceeds the vertex ceiling.
    #[error("chunk size {size} exceeds the largest meshable size {max}")]
    ChunkTooLarge {
        /// Requested side length.
        size: usize,
        /// Largest side length that fits the vertex ceiling.
        max: usize,
    },
    /// Zero octaves leave nothing to sum.
    #[error("octave count must be at least 1")]
    DegenerateOctaves,
    /// Frequency, lacunarity, or persistence is non-positive or not finite.
    #[error("invalid noise parameter `{0}`")]
    InvalidNoiseParameter(&'static str),
    /// Heightmap dimensions disagree with its sample count.
    #[error("heightmap of {width}x{depth} needs {expected} samples, got {actual}")]
    HeightmapShape {
        /// Columns along X.
        width: usize,
        /// Columns along Z.
        depth: usize,
        /// `width * depth`.
        expected: usize,
        /// Samples supplied.
        actual: usize,
    },
}
