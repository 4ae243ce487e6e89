//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Streaming voxel terrain")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Chunk side length in voxels.
    #[arg(long)]
    pub chunk_size: Option<u32>,

    /// Load radius in chunks.
    #[arg(long)]
    pub load_radius: Option<f32>,

    /// Unload radius in chunks.
    #[arg(long)]
    pub unload_radius: Option<f32>,

    /// Worker threads per pool (0 = inline).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Directory for the disk cache tier.
    #[arg(long)]
    pub disk_cache: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(size) = args.chunk_size {
            self.world.chunk_size = size;
        }
        if let Some(r) = args.load_radius {
            self.streaming.load_radius = r;
        }
        if let Some(r) = args.unload_radius {
            self.streaming.unload_radius = r;
        }
        if let Some(threads) = args.threads {
            self.workers.thread_count = threads;
        }
        if let Some(ref dir) = args.disk_cache {
            self.cache.disk_cache_directory = Some(dir.clone());
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
