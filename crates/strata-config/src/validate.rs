//! Startup validation. Every rule here is fatal: out-of-range values are
//! reported, never clamped.

use strata_voxel::{MAX_VERTICES_PER_CHUNK, worst_case_vertex_count};

use crate::config::{CacheCapacity, Config};
use crate::error::ConfigError;

impl Config {
    /// Check every setting the pipeline depends on.
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_world()?;
        self.validate_terrain()?;
        self.validate_streaming()?;
        self.validate_remesh()?;
        self.validate_cache()?;
        Ok(())
    }

    fn validate_world(&self) -> Result<(), ConfigError> {
        let size = self.world.chunk_size as usize;
        if size == 0 {
            return Err(ConfigError::invalid("world.chunk_size", "must be nonzero"));
        }
        if !size.is_power_of_two() {
            return Err(ConfigError::invalid(
                "world.chunk_size",
                format!("{size} is not a power of two"),
            ));
        }
        let worst = worst_case_vertex_count(size);
        if worst > MAX_VERTICES_PER_CHUNK {
            return Err(ConfigError::invalid(
                "world.chunk_size",
                format!(
                    "worst-case mesh of {worst} vertices exceeds the ceiling of {MAX_VERTICES_PER_CHUNK}"
                ),
            ));
        }
        if !(self.world.voxel_world_size > 0.0) {
            return Err(ConfigError::invalid(
                "world.voxel_world_size",
                "must be positive",
            ));
        }
        Ok(())
    }

    fn validate_terrain(&self) -> Result<(), ConfigError> {
        let t = &self.terrain;
        if t.octaves == 0 {
            return Err(ConfigError::invalid("terrain.octaves", "must be at least 1"));
        }
        if !(t.frequency > 0.0) || !t.frequency.is_finite() {
            return Err(ConfigError::invalid("terrain.frequency", "must be positive"));
        }
        if !(t.lacunarity > 0.0) {
            return Err(ConfigError::invalid("terrain.lacunarity", "must be positive"));
        }
        if !(t.persistence > 0.0) {
            return Err(ConfigError::invalid("terrain.persistence", "must be positive"));
        }
        Ok(())
    }

    fn validate_streaming(&self) -> Result<(), ConfigError> {
        let s = &self.streaming;
        if !(s.load_radius > 0.0) {
            return Err(ConfigError::invalid("streaming.load_radius", "must be positive"));
        }
        if !(s.unload_radius > s.load_radius) {
            return Err(ConfigError::invalid(
                "streaming.unload_radius",
                format!(
                    "{} must exceed load_radius {}",
                    s.unload_radius, s.load_radius
                ),
            ));
        }
        if s.max_chunks_per_frame == 0 {
            return Err(ConfigError::invalid(
                "streaming.max_chunks_per_frame",
                "must be at least 1",
            ));
        }
        if !(s.stream_budget_ms > 0.0) {
            return Err(ConfigError::invalid(
                "streaming.stream_budget_ms",
                "must be positive",
            ));
        }
        if s.burst_multiplier == 0 {
            return Err(ConfigError::invalid(
                "streaming.burst_multiplier",
                "must be at least 1",
            ));
        }
        // Normal movement stays under the teleport threshold, so the gap must cover it.
        let gap = (s.unload_radius - s.load_radius) * self.chunk_world_size();
        if s.teleport_threshold > gap {
            return Err(ConfigError::invalid(
                "streaming.teleport_threshold",
                format!(
                    "per-tick displacement {} exceeds the hysteresis gap of {gap} world units",
                    s.teleport_threshold
                ),
            ));
        }
        Ok(())
    }

    fn validate_remesh(&self) -> Result<(), ConfigError> {
        let r = &self.remesh;
        if !(r.remesh_budget_ms > 0.0) {
            return Err(ConfigError::invalid(
                "remesh.remesh_budget_ms",
                "must be positive",
            ));
        }
        if !(r.collision_budget_ms > 0.0) {
            return Err(ConfigError::invalid(
                "remesh.collision_budget_ms",
                "must be positive",
            ));
        }
        if r.collision_stride == 0 || self.world.chunk_size % r.collision_stride != 0 {
            return Err(ConfigError::invalid(
                "remesh.collision_stride",
                format!(
                    "{} must be nonzero and divide chunk_size {}",
                    r.collision_stride, self.world.chunk_size
                ),
            ));
        }
        Ok(())
    }

    fn validate_cache(&self) -> Result<(), ConfigError> {
        let capacity = match self.cache.memory_cache_capacity {
            CacheCapacity::Entries(n) | CacheCapacity::Bytes(n) => n,
        };
        if capacity == 0 {
            return Err(ConfigError::invalid(
                "cache.memory_cache_capacity",
                "must be nonzero",
            ));
        }
        if self.cache.memory_budget_bytes == 0 {
            return Err(ConfigError::invalid(
                "cache.memory_budget_bytes",
                "must be nonzero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> &'static str {
        match result {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().expect("defaults must validate");
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut config = Config::default();
        config.world.chunk_size = 0;
        assert_eq!(field_of(config.validate()), "world.chunk_size");
    }

    #[test]
    fn test_non_power_of_two_rejected() {
        let mut config = Config::default();
        config.world.chunk_size = 24;
        assert_eq!(field_of(config.validate()), "world.chunk_size");
    }

    #[test]
    fn test_chunk_size_over_vertex_ceiling_rejected() {
        let mut config = Config::default();
        config.world.chunk_size = 32;
        config.remesh.collision_stride = 4;
        assert_eq!(field_of(config.validate()), "world.chunk_size");
    }

    #[test]
    fn test_radii_must_be_positive_and_ordered() {
        let mut config = Config::default();
        config.streaming.load_radius = 0.0;
        assert_eq!(field_of(config.validate()), "streaming.load_radius");

        let mut config = Config::default();
        config.streaming.unload_radius = config.streaming.load_radius;
        assert_eq!(field_of(config.validate()), "streaming.unload_radius");
    }

    #[test]
    fn test_degenerate_octaves_rejected() {
        let mut config = Config::default();
        config.terrain.octaves = 0;
        assert_eq!(field_of(config.validate()), "terrain.octaves");
    }

    #[test]
    fn test_teleport_threshold_must_fit_hysteresis_gap() {
        let mut config = Config::default();
        // Gap is (8 - 6) * 16 = 32 world units.
        config.streaming.teleport_threshold = 40.0;
        assert_eq!(field_of(config.validate()), "streaming.teleport_threshold");
    }

    #[test]
    fn test_collision_stride_must_divide_chunk() {
        let mut config = Config::default();
        config.remesh.collision_stride = 3;
        assert_eq!(field_of(config.validate()), "remesh.collision_stride");
    }

    #[test]
    fn test_zero_cache_capacity_rejected() {
        let mut config = Config::default();
        config.cache.memory_cache_capacity = CacheCapacity::Bytes(0);
        assert_eq!(field_of(config.validate()), "cache.memory_cache_capacity");
    }
}
