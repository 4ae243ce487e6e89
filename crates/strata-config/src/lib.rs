//! Configuration system for the Strata terrain pipeline.
//!
//! Settings persist to disk as RON files, accept CLI overrides via clap, and
//! are validated once at startup. A config that passes [`Config::validate`]
//! is treated as immutable for the lifetime of a streamer.

mod cli;
mod config;
mod error;
mod validate;

pub use cli::CliArgs;
pub use config::{
    CacheCapacity, CacheConfig, Config, DebugConfig, RemeshConfig, StreamingConfig,
    TerrainConfig, WorkerConfig, WorldConfig,
};
pub use error::ConfigError;
