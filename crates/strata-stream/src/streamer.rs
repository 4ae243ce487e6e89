//! The chunk streamer: decides which chunks must be resident around the
//! observer and drives them through generation, meshing, activation, and
//! eviction under per-tick budgets.
//!
//! All bookkeeping lives on the tick thread. Worker pools only ever see
//! buffers moved into their tasks and hand them back in their results.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};
use strata_config::Config;
use strata_mesh::{
    ChunkGeometry, ChunkMeshState, CollisionMesh, MeshKind, MeshingPipeline, MeshingResult,
    MeshingTask,
};
use strata_terrain::{
    AsyncChunkGenerator, ColumnParams, GeneratedChunk, GenerationTask, Heightmap, OctaveParams,
    TerrainGenerator,
};
use strata_voxel::{
    ChunkCoord, VoxelBuffer, VoxelDelta, VoxelType, apply_deltas, decode_chunk, encode_chunk,
    split_voxel, world_to_voxel,
};
use tracing::{debug, info, warn};

use crate::budget::FrameBudget;
use crate::burst::{BurstController, predicted_position};
use crate::disk_tier::DiskTier;
use crate::error::StreamError;
use crate::events::{ChunkEvent, ChunkTransform};
use crate::memory_budget::{MemoryBudgetTracker, select_evictions};
use crate::memory_tier::{CachedChunk, MemoryTier};
use crate::queue::ChunkQueue;
use crate::record::ChunkRecord;
use crate::state::ChunkState;
use crate::stats::StreamStats;

/// What happened to an edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// Applied to an active chunk; a remesh is queued.
    Applied,
    /// The chunk is not active; the edit replays when it loads.
    Deferred,
    /// The voxel already had that value.
    Unchanged,
}

/// A reconstructed buffer and the history that came with it.
struct Restored {
    buffer: VoxelBuffer,
    deltas: Vec<VoxelDelta>,
    dirty: bool,
}

/// Keeps the chunks around an observer resident and meshed.
pub struct Streamer {
    config: Config,
    chunk_size: usize,
    chunk_world_size: f32,
    generator: AsyncChunkGenerator,
    mesher: MeshingPipeline,
    records: FxHashMap<ChunkCoord, ChunkRecord>,
    load_queue: ChunkQueue,
    remesh_queue: ChunkQueue,
    collision_queue: ChunkQueue,
    /// Initial mesh tasks the pool could not take yet.
    mesh_backlog: VecDeque<MeshingTask>,
    memory_tier: MemoryTier,
    disk_tier: Option<DiskTier>,
    /// Edits for chunks that are not active, oldest first.
    retained: FxHashMap<ChunkCoord, Vec<VoxelDelta>>,
    memory: MemoryBudgetTracker,
    burst: BurstController,
    events: Vec<ChunkEvent>,
    observer_chunk: Option<ChunkCoord>,
    focus_chunk: Option<ChunkCoord>,
    /// Monotonic across all chunks so results from an unloaded record can
    /// never match its successor.
    version_counter: u64,
    tick: u64,
    totals: StreamStats,
}

impl Streamer {
    /// Builds a streamer on noise-driven terrain.
    pub fn new(config: Config) -> Result<Self, StreamError> {
        Self::build(config, None)
    }

    /// Builds a streamer whose columns read `heightmap` where it has data.
    pub fn with_heightmap(config: Config, heightmap: Arc<Heightmap>) -> Result<Self, StreamError> {
        Self::build(config, Some(heightmap))
    }

    fn build(config: Config, heightmap: Option<Arc<Heightmap>>) -> Result<Self, StreamError> {
        config.validate()?;

        let chunk_size = config.world.chunk_size as usize;
        let terrain = &config.terrain;
        let params = ColumnParams {
            octaves: OctaveParams {
                octaves: terrain.octaves,
                frequency: terrain.frequency,
                lacunarity: terrain.lacunarity,
                persistence: terrain.persistence,
            },
            amplitude: terrain.amplitude,
            base_height: terrain.base_height,
            grass_thickness: terrain.grass_thickness,
            dirt_thickness: terrain.dirt_thickness,
            water_level: terrain.water_level,
            heightmap,
        };
        let terrain_generator = Arc::new(TerrainGenerator::new(config.world.seed, chunk_size, params)?);

        let workers = &config.workers;
        let generator =
            AsyncChunkGenerator::new(terrain_generator, workers.thread_count, workers.max_in_flight);
        let mesher = MeshingPipeline::new(workers.thread_count, workers.max_in_flight);

        let disk_tier = config
            .cache
            .disk_cache_directory
            .as_deref()
            .map(DiskTier::open)
            .transpose()?;

        let streaming = &config.streaming;
        let burst = BurstController::new(
            streaming.teleport_threshold,
            streaming.burst_multiplier,
            streaming.burst_duration_ticks,
        );

        info!(
            seed = config.world.seed,
            chunk_size,
            load_radius = streaming.load_radius,
            unload_radius = streaming.unload_radius,
            threads = workers.thread_count,
            disk_tier = disk_tier.is_some(),
            "streamer ready"
        );

        Ok(Self {
            chunk_size,
            chunk_world_size: config.chunk_world_size(),
            generator,
            mesher,
            records: FxHashMap::default(),
            load_queue: ChunkQueue::new(),
            remesh_queue: ChunkQueue::new(),
            collision_queue: ChunkQueue::new(),
            mesh_backlog: VecDeque::new(),
            memory_tier: MemoryTier::new(config.cache.memory_cache_capacity),
            disk_tier,
            retained: FxHashMap::default(),
            memory: MemoryBudgetTracker::new(config.cache.memory_budget_bytes),
            burst,
            events: Vec::new(),
            observer_chunk: None,
            focus_chunk: None,
            version_counter: 0,
            tick: 0,
            totals: StreamStats::default(),
            config,
        })
    }

    // --- Tick ---

    /// Advances the streamer by one tick.
    ///
    /// `observer` is the world-space observer position; `dt` is the time
    /// since the previous tick in seconds and only feeds predictive loading.
    pub fn tick(&mut self, observer: Vec3, dt: f32) -> StreamStats {
        self.tick += 1;
        let mut stats = StreamStats::default();

        let (displacement, teleported) = self.burst.observe(observer);
        if teleported {
            info!(
                distance = displacement.length(),
                ticks = self.burst.remaining_ticks(),
                "observer teleported, raising stream budget"
            );
        }
        stats.burst = self.burst.is_active();
        let scale = self.burst.scale();

        let observer_chunk = ChunkCoord::from_world(observer, self.chunk_world_size);
        let focus_chunk = self.focus_chunk_for(observer, displacement, dt, teleported);
        if self.observer_chunk != Some(observer_chunk) || self.focus_chunk != Some(focus_chunk) {
            self.observer_chunk = Some(observer_chunk);
            self.focus_chunk = Some(focus_chunk);
            self.update_demand(&mut stats);
        }

        let streaming = &self.config.streaming;
        let budget = FrameBudget::start_ms(streaming.stream_budget_ms * scale as f32);
        let max_units = streaming.max_chunks_per_frame.saturating_mul(scale);

        self.collect_generated(&budget);
        self.collect_meshes(&budget, &mut stats);
        self.dispatch_loads(&budget, max_units, &mut stats);
        self.unload_distant(&budget, max_units, &mut stats);
        stats.stream_time = budget.elapsed();

        // The ceiling is hard, so forced eviction is not bounded by the
        // stream budget.
        self.enforce_memory_ceiling(&mut stats);

        self.drain_remesh_queue(&mut stats);
        self.drain_collision_queue(&mut stats);

        if stats.activated > 0 || stats.unloaded > 0 || stats.forced_evictions > 0 {
            debug!(tick = self.tick, %stats, "stream tick");
        }
        self.totals.accumulate(&stats);
        stats
    }

    /// Ticks at a fixed position until no work remains or `max_ticks` pass.
    /// Returns the number of ticks run.
    pub fn settle(&mut self, observer: Vec3, max_ticks: usize) -> usize {
        for ticks in 1..=max_ticks {
            self.tick(observer, 0.0);
            if self.is_idle() {
                return ticks;
            }
            if !self.mesher.is_inline() || !self.generator.is_inline() {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        max_ticks
    }

    fn focus_chunk_for(&self, observer: Vec3, displacement: Vec3, dt: f32, teleported: bool) -> ChunkCoord {
        let streaming = &self.config.streaming;
        if !streaming.predictive_loading || teleported || dt <= 0.0 {
            return ChunkCoord::from_world(observer, self.chunk_world_size);
        }
        // Caps the world-space lead only. Chunk flooring can still push a
        // diagonal focus past the gap; `update_demand` filters those.
        let gap = streaming.unload_radius - streaming.load_radius;
        let max_lead = (gap - 1.0).max(0.0) * self.chunk_world_size;
        let ahead = predicted_position(observer, displacement / dt, streaming.prediction_seconds, max_lead);
        ChunkCoord::from_world(ahead, self.chunk_world_size)
    }

    /// Recomputes the required set around the observer (and the predicted
    /// focus), queues what is missing, and cancels what is no longer wanted.
    fn update_demand(&mut self, stats: &mut StreamStats) {
        let Some(observer) = self.observer_chunk else {
            return;
        };
        let focus = self.focus_chunk.unwrap_or(observer);
        let load_radius = self.config.streaming.load_radius;
        let unload_sq = self.config.streaming.unload_radius.powi(2);

        let mut required = FxHashSet::default();
        let reach = load_radius.ceil() as i32;
        let centers = if focus == observer { vec![observer] } else { vec![observer, focus] };
        for center in centers {
            for dz in -reach..=reach {
                for dy in -reach..=reach {
                    for dx in -reach..=reach {
                        let coord = center.offset(dx, dy, dz);
                        // Focus coords past the unload radius would be
                        // unloaded again on the next tick.
                        if coord.distance_sq(center) as f32 <= load_radius * load_radius
                            && coord.distance_sq(observer) as f32 <= unload_sq
                        {
                            required.insert(coord);
                        }
                    }
                }
            }
        }

        // Queued loads that left the required set never start.
        let dropped = self.load_queue.retain(|coord| required.contains(coord));
        stats.cancelled += dropped.len() as u32;

        self.load_queue.reprioritize(observer);
        self.remesh_queue.reprioritize(observer);
        self.collision_queue.reprioritize(observer);

        for coord in required {
            if !self.records.contains_key(&coord) && self.load_queue.push(coord, observer) {
                stats.enqueued += 1;
            }
        }

        // In-flight generation beyond the unload radius finishes on its
        // worker and the result is discarded.
        let abandoned: Vec<ChunkCoord> = self
            .records
            .iter()
            .filter(|(coord, record)| {
                record.state == ChunkState::Generating && coord.distance_sq(observer) as f32 > unload_sq
            })
            .map(|(coord, _)| *coord)
            .collect();
        for coord in abandoned {
            self.generator.cancel(&coord);
            self.records.remove(&coord);
            stats.cancelled += 1;
            debug!(%coord, "cancelled in-flight generation");
        }
    }

    // --- Generation and meshing results ---

    fn collect_generated(&mut self, budget: &FrameBudget) {
        while budget.has_time() {
            let Some(chunk) = self.generator.try_recv() else {
                break;
            };
            self.on_generated(chunk);
        }
    }

    fn on_generated(&mut self, chunk: GeneratedChunk) {
        let coord = chunk.coord;
        let Some(record) = self.records.get_mut(&coord) else {
            debug!(%coord, "discarding generated chunk for cancelled load");
            return;
        };
        if record.state != ChunkState::Generating {
            return;
        }

        let mut buffer = chunk.buffer;
        if let Some(deltas) = self.retained.remove(&coord) {
            record.absorb(&mut buffer, &deltas);
            record.dirty = true;
        }
        record.state = ChunkState::Meshing;
        let task = MeshingTask {
            coord,
            buffer,
            data_version: record.data_version,
            kind: MeshKind::Full,
            collision_stride: self.config.remesh.collision_stride as usize,
        };
        debug!(%coord, us = chunk.generation_time_us, "generated");
        self.submit_initial_mesh(task);
    }

    fn submit_initial_mesh(&mut self, task: MeshingTask) {
        if !self.mesh_backlog.is_empty() {
            self.mesh_backlog.push_back(task);
            return;
        }
        if let Err(task) = self.mesher.submit(task) {
            self.mesh_backlog.push_back(task);
        }
    }

    fn retry_mesh_backlog(&mut self) {
        while let Some(task) = self.mesh_backlog.pop_front() {
            if let Err(task) = self.mesher.submit(task) {
                self.mesh_backlog.push_front(task);
                break;
            }
        }
    }

    fn collect_meshes(&mut self, budget: &FrameBudget, stats: &mut StreamStats) {
        self.retry_mesh_backlog();
        while budget.has_time() {
            let Some(result) = self.mesher.try_recv() else {
                break;
            };
            self.on_meshed(result, stats);
        }
    }

    fn on_meshed(&mut self, result: MeshingResult, stats: &mut StreamStats) {
        let coord = result.coord;
        match result.kind {
            MeshKind::Full => self.activate(result, stats),
            MeshKind::Render => {
                let center = self.observer_chunk.unwrap_or(coord);
                let transform = self.transform(coord);
                let Some(record) = self.records.get_mut(&coord) else {
                    return;
                };
                if record.state != ChunkState::Active
                    || !record.mesh_state.complete_remesh(result.data_version)
                {
                    stats.stale_results += 1;
                    return;
                }
                if let Some(geometry) = result.geometry {
                    let geometry = Arc::new(geometry);
                    record.geometry = Some(Arc::clone(&geometry));
                    self.events.push(ChunkEvent::Updated {
                        coord,
                        transform,
                        geometry,
                    });
                }
                if record.mesh_state.needs_remesh(record.data_version) {
                    self.remesh_queue.push(coord, center);
                } else if record.collision.is_some()
                    && record.mesh_state.needs_collision(record.data_version)
                {
                    self.collision_queue.push(coord, center);
                }
                self.memory.on_chunk_loaded(coord, record.memory_usage());
            }
            MeshKind::Collision => {
                let transform = self.transform(coord);
                let Some(record) = self.records.get_mut(&coord) else {
                    return;
                };
                if record.state != ChunkState::Active
                    || !record.mesh_state.complete_collision(result.data_version)
                {
                    stats.stale_results += 1;
                    return;
                }
                if let Some(collision) = result.collision {
                    let collision = Arc::new(collision);
                    record.collision = Some(Arc::clone(&collision));
                    self.events.push(ChunkEvent::CollisionUpdated {
                        coord,
                        transform,
                        collision,
                    });
                }
                self.memory.on_chunk_loaded(coord, record.memory_usage());
            }
        }
    }

    /// Completes a chunk's pipeline: its buffer comes home with its meshes.
    fn activate(&mut self, result: MeshingResult, stats: &mut StreamStats) {
        let coord = result.coord;
        let center = self.observer_chunk.unwrap_or(coord);
        let transform = self.transform(coord);
        let Some(record) = self.records.get_mut(&coord) else {
            stats.stale_results += 1;
            return;
        };
        if record.state != ChunkState::Meshing || record.data_version != result.data_version {
            stats.stale_results += 1;
            return;
        }

        let mut geometry = result.geometry.unwrap_or_default();
        let collision = geometry.collision.take().map(Arc::new);
        let geometry = Arc::new(geometry);
        let mut buffer = result.buffer;

        record.state = ChunkState::Active;
        record.geometry = Some(Arc::clone(&geometry));
        record.collision = collision.clone();
        record.mesh_state = ChunkMeshState::meshed_at(result.data_version);
        record.last_access = self.tick;

        // Edits that arrived while the buffer was away.
        if let Some(deltas) = self.retained.remove(&coord) {
            record.absorb(&mut buffer, &deltas);
            record.dirty = true;
            self.version_counter += 1;
            record.data_version = self.version_counter;
            self.remesh_queue.push(coord, center);
        }
        record.buffer = Some(buffer);
        self.memory.on_chunk_loaded(coord, record.memory_usage());

        self.events.push(ChunkEvent::Activated {
            coord,
            transform,
            geometry,
            collision,
        });
        stats.activated += 1;
        debug!(%coord, us = result.mesh_time_us, "activated");
    }

    // --- Loads ---

    fn dispatch_loads(&mut self, budget: &FrameBudget, max_units: u32, stats: &mut StreamStats) {
        let Some(observer) = self.observer_chunk else {
            return;
        };
        let mut dispatched = 0;
        while dispatched < max_units && budget.has_time() {
            if self.memory.is_over_budget() {
                debug!(
                    resident = self.memory.total_bytes(),
                    ceiling = self.memory.budget(),
                    "memory ceiling reached, deferring loads"
                );
                break;
            }
            let Some(coord) = self.load_queue.pop() else {
                break;
            };
            if self.records.contains_key(&coord) {
                continue;
            }

            if let Some(restored) = self.restore(coord, stats) {
                self.version_counter += 1;
                let mut record = ChunkRecord::new(ChunkState::Meshing, self.version_counter, self.tick);
                let mut buffer = restored.buffer;
                record.edits.extend(restored.deltas.iter().map(|d| (d.index, d.voxel)));
                record.dirty = restored.dirty;
                if let Some(deltas) = self.retained.remove(&coord) {
                    record.absorb(&mut buffer, &deltas);
                    record.dirty = true;
                }
                let task = MeshingTask {
                    coord,
                    buffer,
                    data_version: record.data_version,
                    kind: MeshKind::Full,
                    collision_stride: self.config.remesh.collision_stride as usize,
                };
                self.records.insert(coord, record);
                self.submit_initial_mesh(task);
            } else {
                let task = GenerationTask {
                    coord,
                    priority: coord.distance_sq(observer),
                };
                if self.generator.submit(task).is_err() {
                    self.load_queue.push(coord, observer);
                    break;
                }
                self.version_counter += 1;
                self.records.insert(
                    coord,
                    ChunkRecord::new(ChunkState::Generating, self.version_counter, self.tick),
                );
                stats.regenerated += 1;
            }
            dispatched += 1;
            stats.dispatched += 1;
        }
    }

    /// Rebuilds a chunk from the memory tier, then the disk tier.
    fn restore(&mut self, coord: ChunkCoord, stats: &mut StreamStats) -> Option<Restored> {
        if let Some(cached) = self.memory_tier.take(&coord) {
            match decode_chunk(&cached.bytes) {
                Ok(decoded) if decoded.buffer.size() == self.chunk_size => {
                    stats.memory_hits += 1;
                    return Some(Restored {
                        buffer: decoded.buffer,
                        deltas: cached.deltas,
                        dirty: cached.dirty,
                    });
                }
                Ok(decoded) => {
                    warn!(%coord, size = decoded.buffer.size(), "memory tier entry has wrong chunk size");
                }
                Err(err) => warn!(%coord, %err, "memory tier entry failed to decode"),
            }
            // Keep the edits even though the buffer is unusable.
            if cached.dirty {
                self.retain_older(coord, cached.deltas);
            }
        }

        let disk = self.disk_tier.as_mut()?;
        let decoded = disk.read(coord)?;
        if decoded.buffer.size() != self.chunk_size {
            warn!(%coord, size = decoded.buffer.size(), "disk tier entry has wrong chunk size, replaying edits");
            self.retain_older(coord, decoded.deltas);
            return None;
        }
        stats.disk_hits += 1;
        Some(Restored {
            buffer: decoded.buffer,
            deltas: decoded.deltas,
            dirty: false,
        })
    }

    /// Queues `deltas` ahead of any newer retained edits for `coord`.
    fn retain_older(&mut self, coord: ChunkCoord, mut deltas: Vec<VoxelDelta>) {
        if deltas.is_empty() {
            return;
        }
        if let Some(newer) = self.retained.remove(&coord) {
            deltas.extend(newer);
        }
        self.retained.insert(coord, deltas);
    }

    // --- Unloads and eviction ---

    fn unload_distant(&mut self, budget: &FrameBudget, max_units: u32, stats: &mut StreamStats) {
        let Some(observer) = self.observer_chunk else {
            return;
        };
        let unload_sq = self.config.streaming.unload_radius.powi(2);
        let mut candidates: Vec<(i64, ChunkCoord)> = self
            .records
            .iter()
            .filter(|(_, record)| record.state == ChunkState::Active)
            .map(|(coord, _)| (coord.distance_sq(observer), *coord))
            .filter(|(dist_sq, _)| *dist_sq as f32 > unload_sq)
            .collect();
        // Farthest first.
        candidates.sort_unstable_by(|a, b| b.cmp(a));

        for (_, coord) in candidates.into_iter().take(max_units as usize) {
            if !budget.has_time() {
                break;
            }
            self.unload(coord);
            stats.unloaded += 1;
        }
    }

    fn enforce_memory_ceiling(&mut self, stats: &mut StreamStats) {
        if !self.memory.is_over_budget() {
            return;
        }
        let Some(observer) = self.observer_chunk else {
            return;
        };
        let last_access: FxHashMap<ChunkCoord, u64> = self
            .records
            .iter()
            .map(|(coord, record)| (*coord, record.last_access))
            .collect();
        for coord in select_evictions(&self.memory, &last_access, observer) {
            self.unload(coord);
            stats.forced_evictions += 1;
        }
        if self.memory.is_over_budget() {
            warn!(
                resident = self.memory.total_bytes(),
                ceiling = self.memory.budget(),
                "memory ceiling still exceeded after forced eviction"
            );
        }
    }

    /// Moves an active chunk into the memory tier.
    fn unload(&mut self, coord: ChunkCoord) {
        let Some(record) = self.records.remove(&coord) else {
            return;
        };
        self.memory.on_chunk_unloaded(&coord);
        self.remesh_queue.remove(&coord);
        self.collision_queue.remove(&coord);
        self.events.push(ChunkEvent::Unloaded { coord });

        let Some(buffer) = record.buffer.as_ref() else {
            return;
        };
        let deltas = record.deltas();
        let cached = CachedChunk {
            bytes: encode_chunk(buffer, &deltas),
            deltas,
            dirty: record.dirty,
        };
        debug!(%coord, dirty = record.dirty, "unloaded");
        for (evicted, chunk) in self.memory_tier.insert(coord, cached) {
            self.spill(evicted, chunk);
        }
    }

    /// Handles an entry pushed out of the memory tier.
    fn spill(&mut self, coord: ChunkCoord, chunk: CachedChunk) {
        if !chunk.dirty {
            return;
        }
        if let Some(disk) = self.disk_tier.as_mut() {
            match disk.write(coord, &chunk.bytes) {
                Ok(()) => {
                    debug!(%coord, "persisted evicted chunk");
                    return;
                }
                Err(err) => warn!(%coord, %err, "disk tier write failed, keeping edits in memory"),
            }
        }
        self.retain_older(coord, chunk.deltas);
    }

    // --- Remesh and collision queues ---

    fn drain_remesh_queue(&mut self, stats: &mut StreamStats) {
        let budget = FrameBudget::start_ms(self.config.remesh.remesh_budget_ms);
        let center = self.observer_chunk.unwrap_or_default();
        let stride = self.config.remesh.collision_stride as usize;
        while budget.has_time() {
            let Some(coord) = self.remesh_queue.pop() else {
                break;
            };
            let Some(record) = self.records.get_mut(&coord) else {
                continue;
            };
            if record.state != ChunkState::Active
                || !record.mesh_state.needs_remesh(record.data_version)
            {
                continue;
            }
            let Some(buffer) = record.buffer.as_ref() else {
                continue;
            };
            let task = MeshingTask {
                coord,
                buffer: buffer.clone(),
                data_version: record.data_version,
                kind: MeshKind::Render,
                collision_stride: stride,
            };
            if self.mesher.submit(task).is_err() {
                self.remesh_queue.push(coord, center);
                break;
            }
            record.mesh_state.remesh_pending = true;
            stats.remeshed += 1;
        }
    }

    fn drain_collision_queue(&mut self, stats: &mut StreamStats) {
        let budget = FrameBudget::start_ms(self.config.remesh.collision_budget_ms);
        let center = self.observer_chunk.unwrap_or_default();
        let stride = self.config.remesh.collision_stride as usize;
        while budget.has_time() {
            let Some(coord) = self.collision_queue.pop() else {
                break;
            };
            let Some(record) = self.records.get_mut(&coord) else {
                continue;
            };
            if record.state != ChunkState::Active
                || !record.mesh_state.needs_collision(record.data_version)
            {
                continue;
            }
            let Some(buffer) = record.buffer.as_ref() else {
                continue;
            };
            let task = MeshingTask {
                coord,
                buffer: buffer.clone(),
                data_version: record.data_version,
                kind: MeshKind::Collision,
                collision_stride: stride,
            };
            if self.mesher.submit(task).is_err() {
                self.collision_queue.push(coord, center);
                break;
            }
            record.mesh_state.collision_pending = true;
            stats.collision_rebuilt += 1;
        }
    }

    // --- Edits ---

    /// Sets the voxel containing `world`.
    pub fn set_voxel(&mut self, world: Vec3, voxel: VoxelType) -> EditOutcome {
        let (coord, (x, y, z)) = split_voxel(
            world_to_voxel(world, self.config.world.voxel_world_size),
            self.chunk_size,
        );
        let index = (x + y * self.chunk_size + z * self.chunk_size * self.chunk_size) as u32;
        self.edit_chunk(coord, &[VoxelDelta::new(index, voxel)]).0
    }

    /// Clears every voxel whose center lies within `radius` of `center`.
    /// Returns the number of voxels changed or deferred.
    pub fn destroy_sphere(&mut self, center: Vec3, radius: f32) -> usize {
        let voxel_size = self.config.world.voxel_world_size;
        let c = center / voxel_size;
        let r = radius.max(0.0) / voxel_size;
        let min = (c - Vec3::splat(r)).floor().as_ivec3();
        let max = (c + Vec3::splat(r)).ceil().as_ivec3();
        let size = self.chunk_size;

        let mut per_chunk: BTreeMap<ChunkCoord, Vec<VoxelDelta>> = BTreeMap::new();
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    let voxel_center = Vec3::new(x as f32, y as f32, z as f32) + Vec3::splat(0.5);
                    if voxel_center.distance_squared(c) > r * r {
                        continue;
                    }
                    let (coord, (lx, ly, lz)) = split_voxel(glam::IVec3::new(x, y, z), size);
                    let index = (lx + ly * size + lz * size * size) as u32;
                    per_chunk
                        .entry(coord)
                        .or_default()
                        .push(VoxelDelta::new(index, VoxelType::Air));
                }
            }
        }

        let changed = per_chunk
            .into_iter()
            .map(|(coord, deltas)| self.edit_chunk(coord, &deltas).1)
            .sum();
        debug!(?center, radius, changed, "destroyed sphere");
        changed
    }

    fn edit_chunk(&mut self, coord: ChunkCoord, deltas: &[VoxelDelta]) -> (EditOutcome, usize) {
        let center = self.observer_chunk.unwrap_or(coord);
        let record = match self.records.get_mut(&coord) {
            Some(record) if record.state == ChunkState::Active && record.buffer.is_some() => record,
            _ => {
                self.retained.entry(coord).or_default().extend_from_slice(deltas);
                return (EditOutcome::Deferred, deltas.len());
            }
        };
        let Some(buffer) = record.buffer.as_mut() else {
            return (EditOutcome::Unchanged, 0);
        };

        let mut changed = 0;
        for delta in deltas {
            if let Some(previous) = buffer.set_index(delta.index as usize, delta.voxel)
                && previous != delta.voxel
            {
                record.edits.insert(delta.index, delta.voxel);
                changed += 1;
            }
        }
        if changed == 0 {
            return (EditOutcome::Unchanged, 0);
        }

        record.dirty = true;
        self.version_counter += 1;
        record.data_version = self.version_counter;
        record.last_access = self.tick;
        let usage = record.memory_usage();
        self.memory.on_chunk_loaded(coord, usage);
        self.remesh_queue.push(coord, center);
        (EditOutcome::Applied, changed)
    }

    // --- Persistence ---

    /// Writes every dirty chunk (active, memory-cached, or with retained
    /// edits) to the disk tier. Returns the number of files written.
    ///
    /// Without a disk tier there is nothing to persist and this returns 0.
    /// Chunks whose buffer is still in a meshing task are written by a
    /// later flush.
    pub fn flush(&mut self) -> Result<usize, StreamError> {
        let Some(disk) = self.disk_tier.as_mut() else {
            debug!("no disk tier configured, nothing to flush");
            return Ok(0);
        };
        let mut written = 0;

        for (coord, record) in self.records.iter_mut() {
            if !record.dirty {
                continue;
            }
            let Some(buffer) = record.buffer.as_ref() else {
                continue;
            };
            disk.write(*coord, &encode_chunk(buffer, &record.deltas()))?;
            record.dirty = false;
            written += 1;
        }

        for (coord, cached) in self.memory_tier.dirty_entries_mut() {
            disk.write(*coord, &cached.bytes)?;
            cached.dirty = false;
            written += 1;
        }

        // Retained edits for chunks with no resident buffer: rebuild the
        // base, replay, persist.
        let pending: Vec<ChunkCoord> = self
            .retained
            .keys()
            .filter(|coord| !self.records.contains_key(*coord))
            .copied()
            .collect();
        for coord in pending {
            let Some(newer) = self.retained.remove(&coord) else {
                continue;
            };
            let base = self
                .memory_tier
                .take(&coord)
                .and_then(|cached| decode_chunk(&cached.bytes).ok())
                .or_else(|| disk.read(coord))
                .filter(|decoded| decoded.buffer.size() == self.chunk_size);
            let (mut buffer, mut deltas) = match base {
                Some(decoded) => (decoded.buffer, decoded.deltas),
                None => (self.generator.generator().generate(coord), Vec::new()),
            };
            apply_deltas(&mut buffer, &newer);
            deltas.extend(newer);
            let deltas = dedup_deltas(deltas);
            disk.write(coord, &encode_chunk(&buffer, &deltas))?;
            written += 1;
        }

        info!(written, "flushed dirty chunks to disk");
        Ok(written)
    }

    // --- Accessors ---

    /// Takes the events produced since the last call. Events accumulate
    /// until drained.
    pub fn drain_events(&mut self) -> Vec<ChunkEvent> {
        std::mem::take(&mut self.events)
    }

    /// Lifecycle state of `coord`, `None` when unrequested.
    pub fn chunk_state(&self, coord: ChunkCoord) -> Option<ChunkState> {
        if let Some(record) = self.records.get(&coord) {
            return Some(record.state);
        }
        if self.load_queue.contains(&coord) {
            Some(ChunkState::Queued)
        } else if self.memory_tier.contains(&coord) {
            Some(ChunkState::MemoryCached)
        } else if self.disk_tier.as_ref().is_some_and(|disk| disk.contains(&coord)) {
            Some(ChunkState::DiskCached)
        } else {
            None
        }
    }

    /// Voxels of an active chunk.
    pub fn voxel_buffer(&self, coord: ChunkCoord) -> Option<&VoxelBuffer> {
        self.active(coord)?.buffer.as_ref()
    }

    /// Render geometry of an active chunk.
    pub fn geometry(&self, coord: ChunkCoord) -> Option<&Arc<ChunkGeometry>> {
        self.active(coord)?.geometry.as_ref()
    }

    /// Collision geometry of an active chunk.
    pub fn collision(&self, coord: ChunkCoord) -> Option<&Arc<CollisionMesh>> {
        self.active(coord)?.collision.as_ref()
    }

    /// The voxel at `world`, if its chunk is active.
    pub fn voxel_at(&self, world: Vec3) -> Option<VoxelType> {
        let voxel = world_to_voxel(world, self.config.world.voxel_world_size);
        let (coord, (x, y, z)) = split_voxel(voxel, self.chunk_size);
        Some(self.voxel_buffer(coord)?.get(x, y, z))
    }

    /// Returns `true` if the chunk has edits not yet persisted.
    pub fn is_dirty(&self, coord: ChunkCoord) -> bool {
        self.records.get(&coord).is_some_and(|r| r.dirty)
            || self.memory_tier.peek(&coord).is_some_and(|c| c.dirty)
            || self.retained.contains_key(&coord)
    }

    /// Coordinates of all active chunks, sorted.
    pub fn active_chunks(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self
            .records
            .iter()
            .filter(|(_, r)| r.state == ChunkState::Active)
            .map(|(c, _)| *c)
            .collect();
        coords.sort_unstable();
        coords
    }

    /// Number of active chunks.
    pub fn active_count(&self) -> usize {
        self.records.values().filter(|r| r.state == ChunkState::Active).count()
    }

    /// Chunks waiting in the load queue.
    pub fn queued_count(&self) -> usize {
        self.load_queue.len()
    }

    /// Chunks in the memory tier.
    pub fn memory_cached_count(&self) -> usize {
        self.memory_tier.len()
    }

    /// Estimated resident bytes.
    pub fn resident_bytes(&self) -> usize {
        self.memory.total_bytes()
    }

    /// Chunk under the observer as of the last tick.
    pub fn observer_chunk(&self) -> Option<ChunkCoord> {
        self.observer_chunk
    }

    /// Returns `true` when no load, mesh, remesh, or collision work remains.
    pub fn is_idle(&self) -> bool {
        self.load_queue.is_empty()
            && self.mesh_backlog.is_empty()
            && self.remesh_queue.is_empty()
            && self.collision_queue.is_empty()
            && self.records.values().all(|r| {
                r.state == ChunkState::Active
                    && !r.mesh_state.remesh_pending
                    && !r.mesh_state.collision_pending
            })
    }

    /// Counters accumulated over every tick.
    pub fn totals(&self) -> &StreamStats {
        &self.totals
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// The configuration the streamer was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// World placement for `coord`'s geometry.
    pub fn transform(&self, coord: ChunkCoord) -> ChunkTransform {
        ChunkTransform::for_chunk(coord, self.chunk_size, self.config.world.voxel_world_size)
    }

    fn active(&self, coord: ChunkCoord) -> Option<&ChunkRecord> {
        self.records.get(&coord).filter(|r| r.state == ChunkState::Active)
    }
}

/// Collapses a history to one delta per index, last write wins, index order.
fn dedup_deltas(deltas: Vec<VoxelDelta>) -> Vec<VoxelDelta> {
    let latest: BTreeMap<u32, VoxelType> = deltas.into_iter().map(|d| (d.index, d.voxel)).collect();
    latest
        .into_iter()
        .map(|(index, voxel)| VoxelDelta::new(index, voxel))
        .collect()
}
