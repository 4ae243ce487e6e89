use std::path::PathBuf;

use strata_config::ConfigError;
use strata_terrain::TerrainError;

/// Errors raised while building or flushing a streamer.
///
/// Per-tick failures (a corrupt cache file, a saturated pool) are recovered
/// inside the tick and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The terrain generator rejected its parameters.
    #[error("terrain generator rejected parameters: {0}")]
    Terrain(#[from] TerrainError),

    /// Disk tier I/O failed.
    #[error("disk cache I/O failed at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}
