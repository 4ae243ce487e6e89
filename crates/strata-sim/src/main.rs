//! Headless driver for the terrain pipeline.
//!
//! Loads `config.ron` (CLI flags override it), streams terrain around a
//! scripted observer, carves a few craters along the way, and flushes
//! edits to the disk tier on exit.
//!
//! Run with `cargo run -p strata-sim -- --threads 4 --disk-cache ./cache`.

mod path;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use glam::Vec3;
use strata_config::{CliArgs, Config};
use strata_stream::{ChunkEvent, StreamStats, Streamer};
use tracing::{error, info, warn};

use crate::path::ObserverPath;

const TICK_SECONDS: f32 = 1.0 / 60.0;
const STATS_INTERVAL: u64 = 60;
const CRATER_INTERVAL: u64 = 90;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("strata")
    });

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let mut streamer = match Streamer::new(config) {
        Ok(streamer) => streamer,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    run(&mut streamer);

    match streamer.flush() {
        Ok(written) => info!(written, "shutdown complete"),
        Err(e) => {
            error!("flush failed: {e}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn run(streamer: &mut Streamer) {
    let chunk_world_size = streamer.config().chunk_world_size();
    let path = ObserverPath::tour(chunk_world_size, TICK_SECONDS);
    info!(ticks = path.total_ticks(), "starting tour");

    let started = Instant::now();
    let mut window = StreamStats::default();
    let mut geometry_events = 0usize;

    for observer in path {
        let stats = streamer.tick(observer, TICK_SECONDS);
        window.accumulate(&stats);

        for event in streamer.drain_events() {
            match event {
                ChunkEvent::Activated { .. } | ChunkEvent::Updated { .. } => geometry_events += 1,
                ChunkEvent::CollisionUpdated { .. } | ChunkEvent::Unloaded { .. } => {}
            }
        }

        let tick = streamer.tick_count();
        if tick % CRATER_INTERVAL == 0 {
            carve_crater(streamer, observer);
        }
        if tick % STATS_INTERVAL == 0 {
            info!(
                tick,
                active = streamer.active_count(),
                queued = streamer.queued_count(),
                cached = streamer.memory_cached_count(),
                resident_kib = streamer.resident_bytes() / 1024,
                "{window}"
            );
            window = StreamStats::default();
        }
    }

    let home = streamer_home(streamer);
    let settle_ticks = streamer.settle(home, 10_000);
    if !streamer.is_idle() {
        warn!(settle_ticks, "pipeline still busy at end of tour");
    }

    let totals = streamer.totals();
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        geometry_events,
        "tour finished: {totals}"
    );
}

/// Clears a sphere just below the observer.
fn carve_crater(streamer: &mut Streamer, observer: Vec3) {
    let size = streamer.config().chunk_world_size();
    let center = observer - Vec3::Y * size;
    let changed = streamer.destroy_sphere(center, size * 0.25);
    info!(?center, changed, "carved crater");
}

fn streamer_home(streamer: &Streamer) -> Vec3 {
    let size = streamer.config().chunk_world_size();
    streamer
        .observer_chunk()
        .map(|coord| coord.center_world(size))
        .unwrap_or(Vec3::ZERO)
}
