//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World identity and chunk geometry.
    pub world: WorldConfig,
    /// Terrain shaping parameters.
    pub terrain: TerrainConfig,
    /// Load/unload radii and per-tick streaming budgets.
    pub streaming: StreamingConfig,
    /// Remesh and collision queue budgets.
    pub remesh: RemeshConfig,
    /// Memory and disk cache tiers.
    pub cache: CacheConfig,
    /// Background worker pool.
    pub workers: WorkerConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World identity and chunk geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed. Same seed, same world.
    pub seed: u64,
    /// Chunk side length in voxels. Must be a power of two.
    pub chunk_size: u32,
    /// Edge length of one voxel in world units.
    pub voxel_world_size: f32,
}

/// Terrain shaping parameters for the noise-driven generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Number of noise octaves summed per column.
    pub octaves: u32,
    /// Base frequency in cycles per voxel.
    pub frequency: f64,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
    /// Amplitude multiplier per octave.
    pub persistence: f64,
    /// Height variation in voxels around `base_height`.
    pub amplitude: f64,
    /// Mean surface height in voxels.
    pub base_height: f64,
    /// Grass layer thickness in voxels.
    pub grass_thickness: u32,
    /// Dirt layer thickness in voxels, below the grass.
    pub dirt_thickness: u32,
    /// Water fills air up to this height when set.
    pub water_level: Option<i32>,
}

/// Streaming radii and the per-tick load budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Chunks within this radius (chunk units) are made resident.
    pub load_radius: f32,
    /// Chunks beyond this radius (chunk units) are unloaded.
    pub unload_radius: f32,
    /// Maximum load dispatches per tick.
    pub max_chunks_per_frame: u32,
    /// Wall-clock budget for the streaming stage per tick.
    pub stream_budget_ms: f32,
    /// Observer displacement per tick (world units) treated as a teleport.
    pub teleport_threshold: f32,
    /// Budget multiplier applied while a teleport burst is active.
    pub burst_multiplier: u32,
    /// Number of ticks a teleport burst lasts.
    pub burst_duration_ticks: u32,
    /// Bias the required set ahead of the observer's velocity.
    pub predictive_loading: bool,
    /// How far ahead (seconds of travel) predictive loading looks.
    pub prediction_seconds: f32,
}

/// Budgets for the amortized remesh and collision queues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemeshConfig {
    /// Wall-clock budget for draining the remesh queue per tick.
    pub remesh_budget_ms: f32,
    /// Wall-clock budget for draining the collision queue per tick.
    pub collision_budget_ms: f32,
    /// Voxel stride for the collision pass (every Nth voxel).
    pub collision_stride: u32,
}

/// Capacity of the in-memory cache tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CacheCapacity {
    /// At most this many cached chunks.
    Entries(usize),
    /// At most this many bytes of compressed chunk data.
    Bytes(usize),
}

/// Memory and disk tier settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Bound on the memory tier.
    pub memory_cache_capacity: CacheCapacity,
    /// Disk tier directory. Without one, dirty chunks keep their edits in memory.
    pub disk_cache_directory: Option<PathBuf>,
    /// Hard ceiling on estimated resident chunk memory.
    pub memory_budget_bytes: usize,
}

/// Background worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker threads per pool. 0 runs every job inline on the tick thread.
    pub thread_count: usize,
    /// Maximum jobs in flight per pool.
    pub max_in_flight: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            chunk_size: 16,
            voxel_world_size: 1.0,
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            frequency: 0.01,
            lacunarity: 2.0,
            persistence: 0.5,
            amplitude: 24.0,
            base_height: 32.0,
            grass_thickness: 1,
            dirt_thickness: 3,
            water_level: Some(24),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            load_radius: 6.0,
            unload_radius: 8.0,
            max_chunks_per_frame: 8,
            stream_budget_ms: 4.0,
            teleport_threshold: 24.0,
            burst_multiplier: 4,
            burst_duration_ticks: 30,
            predictive_loading: true,
            prediction_seconds: 1.0,
        }
    }
}

impl Default for RemeshConfig {
    fn default() -> Self {
        Self {
            remesh_budget_ms: 2.0,
            collision_budget_ms: 1.0,
            collision_stride: 4,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_cache_capacity: CacheCapacity::Entries(1024),
            disk_cache_directory: None,
            memory_budget_bytes: 256 * 1024 * 1024,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_count: 2,
            max_in_flight: 64,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Re-read `config.ron`: returns `Some(new_config)` if the file changed, `None` otherwise.
    ///
    /// A running streamer never picks up the new value; callers rebuild it.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// World-space edge length of one chunk.
    pub fn chunk_world_size(&self) -> f32 {
        self.world.chunk_size as f32 * self.world.voxel_world_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("chunk_size: 16"));
        assert!(ron_str.contains("Entries(1024)"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.cache.memory_cache_capacity = CacheCapacity::Bytes(4096);
        config.cache.disk_cache_directory = Some(PathBuf::from("/tmp/strata"));
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(world: (seed: 7), streaming: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.world.chunk_size, 16);
        assert_eq!(config.terrain, TerrainConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.world.seed = 99;
        config.streaming.load_radius = 3.0;
        config.streaming.unload_radius = 5.0;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.world.seed = 4242;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.world.seed), Some(4242));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "{{not valid}}").unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_chunk_world_size() {
        let mut config = Config::default();
        config.world.voxel_world_size = 0.5;
        assert_eq!(config.chunk_world_size(), 8.0);
    }
}
