//! Asynchronous chunk generation on a bounded worker pool.
//!
//! The tick thread submits [`GenerationTask`]s; workers own each buffer they
//! produce and hand it back by value through the result channel, so no
//! buffer is ever visible to two threads at once. A pool built with zero
//! threads runs every task inline inside [`AsyncChunkGenerator::submit`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use dashmap::DashMap;
use strata_voxel::{ChunkCoord, VoxelBuffer};

use crate::generator::TerrainGenerator;

/// A request to generate a single chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationTask {
    /// Chunk to generate.
    pub coord: ChunkCoord,
    /// Squared chunk distance to the observer at submission time.
    pub priority: i64,
}

/// A generated chunk ready for meshing.
#[derive(Debug)]
pub struct GeneratedChunk {
    /// The chunk matching the original task.
    pub coord: ChunkCoord,
    /// Freshly generated voxels, owned by the receiver from here on.
    pub buffer: VoxelBuffer,
    /// Generation time in microseconds.
    pub generation_time_us: u64,
}

/// Internal wrapper that carries the task and its cancellation flag.
struct PendingTask {
    task: GenerationTask,
    cancelled: Arc<AtomicBool>,
}

/// Generates chunks across a thread pool (or inline with zero threads).
pub struct AsyncChunkGenerator {
    generator: Arc<TerrainGenerator>,
    task_sender: Option<Sender<PendingTask>>,
    result_sender: Sender<GeneratedChunk>,
    result_receiver: Receiver<GeneratedChunk>,
    /// Cancellation flag per outstanding coordinate.
    active_tasks: Arc<DashMap<ChunkCoord, Arc<AtomicBool>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: usize,
    worker_handles: Vec<JoinHandle<()>>,
}

impl AsyncChunkGenerator {
    /// Creates a pool of `thread_count` workers accepting up to
    /// `max_in_flight` outstanding tasks.
    ///
    /// With `thread_count == 0`, or if no worker thread can be spawned,
    /// tasks run inline on the submitting thread.
    pub fn new(generator: Arc<TerrainGenerator>, thread_count: usize, max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        let (task_sender, task_receiver) = bounded::<PendingTask>(max_in_flight);
        let (result_sender, result_receiver) = unbounded::<GeneratedChunk>();
        let active_tasks = Arc::new(DashMap::new());
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut worker_handles = Vec::with_capacity(thread_count);
        for i in 0..thread_count {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let generator = Arc::clone(&generator);
            let in_flight = Arc::clone(&in_flight);

            let spawned = std::thread::Builder::new()
                .name(format!("chunk-gen-{i}"))
                .spawn(move || {
                    while let Ok(pending) = receiver.recv() {
                        if !pending.cancelled.load(Ordering::Relaxed) {
                            let chunk = run_task(&generator, pending.task);
                            // Completed work for a cancelled task is discarded, not pre-empted.
                            if !pending.cancelled.load(Ordering::Relaxed) {
                                let _ = sender.send(chunk);
                            }
                        }
                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                });
            match spawned {
                Ok(handle) => worker_handles.push(handle),
                Err(err) => tracing::warn!(%err, "failed to spawn chunk generation worker"),
            }
        }
        if thread_count > 0 && worker_handles.is_empty() {
            tracing::warn!("no generation workers available, generating inline");
        }

        let task_sender = (!worker_handles.is_empty()).then_some(task_sender);

        Self {
            generator,
            task_sender,
            result_sender,
            result_receiver,
            active_tasks,
            in_flight,
            max_in_flight,
            worker_handles,
        }
    }

    /// A pool sized to the machine, leaving headroom for the tick thread.
    pub fn with_defaults(generator: Arc<TerrainGenerator>) -> Self {
        let cpus = num_cpus::get().max(2);
        Self::new(generator, (cpus - 2).max(1), 64)
    }

    /// Returns `true` when tasks run on the submitting thread.
    pub fn is_inline(&self) -> bool {
        self.task_sender.is_none()
    }

    /// The shared generator.
    pub fn generator(&self) -> &Arc<TerrainGenerator> {
        &self.generator
    }

    /// Submit a chunk for generation.
    ///
    /// Returns `Err(task)` when the pool is saturated; the caller keeps the
    /// task and retries on a later tick.
    #[allow(clippy::result_large_err)]
    pub fn submit(&self, task: GenerationTask) -> Result<(), GenerationTask> {
        let Some(sender) = &self.task_sender else {
            let chunk = run_task(&self.generator, task);
            let _ = self.result_sender.send(chunk);
            return Ok(());
        };
        if self.in_flight.load(Ordering::Relaxed) >= self.max_in_flight {
            return Err(task);
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        if let Some(previous) = self.active_tasks.insert(task.coord, Arc::clone(&cancelled)) {
            previous.store(true, Ordering::Relaxed);
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        sender
            .try_send(PendingTask { task, cancelled })
            .map_err(|e| {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                let task = e.into_inner().task;
                self.active_tasks.remove(&task.coord);
                task
            })
    }

    /// Cancel a submitted task. A task already running completes and its
    /// result is dropped; a task still queued is skipped.
    pub fn cancel(&self, coord: &ChunkCoord) {
        if let Some((_, cancelled)) = self.active_tasks.remove(coord) {
            cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Drain all completed chunks without blocking.
    pub fn drain_results(&self) -> Vec<GeneratedChunk> {
        let mut results = Vec::new();
        while let Ok(chunk) = self.result_receiver.try_recv() {
            self.active_tasks.remove(&chunk.coord);
            results.push(chunk);
        }
        results
    }

    /// Take one completed chunk, if any, without blocking.
    pub fn try_recv(&self) -> Option<GeneratedChunk> {
        let chunk = self.result_receiver.try_recv().ok()?;
        self.active_tasks.remove(&chunk.coord);
        Some(chunk)
    }

    /// Block until one result arrives or `timeout` passes.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<GeneratedChunk> {
        let chunk = self.result_receiver.recv_timeout(timeout).ok()?;
        self.active_tasks.remove(&chunk.coord);
        Some(chunk)
    }

    /// Tasks queued or executing on workers.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Results waiting to be drained.
    pub fn ready_count(&self) -> usize {
        self.result_receiver.len()
    }

    /// Returns `true` if a task for `coord` is outstanding.
    pub fn is_pending(&self, coord: &ChunkCoord) -> bool {
        self.active_tasks.contains_key(coord)
    }

    /// Stop accepting work and join the workers.
    pub fn shutdown(&mut self) {
        self.task_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for AsyncChunkGenerator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_task(generator: &TerrainGenerator, task: GenerationTask) -> GeneratedChunk {
    let start = Instant::now();
    let buffer = generator.generate(task.coord);
    GeneratedChunk {
        coord: task.coord,
        buffer,
        generation_time_us: start.elapsed().as_micros() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ColumnParams;

    fn generator() -> Arc<TerrainGenerator> {
        Arc::new(TerrainGenerator::new(42, 16, ColumnParams::default()).expect("valid params"))
    }

    fn task(x: i32, z: i32) -> GenerationTask {
        GenerationTask {
            coord: ChunkCoord::new(x, 0, z),
            priority: (x * x + z * z) as i64,
        }
    }

    fn collect(pool: &AsyncChunkGenerator, expected: usize) -> Vec<GeneratedChunk> {
        let mut results = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(30);
        while results.len() < expected && Instant::now() < deadline {
            if let Some(chunk) = pool.recv_timeout(Duration::from_millis(50)) {
                results.push(chunk);
            }
        }
        results
    }

    #[test]
    fn test_concurrent_generation_delivers_all() {
        let pool = AsyncChunkGenerator::new(generator(), 4, 64);
        let mut submitted = 0;
        for x in 0..6 {
            for z in 0..6 {
                if pool.submit(task(x, z)).is_ok() {
                    submitted += 1;
                }
            }
        }
        let results = collect(&pool, submitted);
        assert_eq!(results.len(), submitted, "got {}/{submitted}", results.len());
    }

    #[test]
    fn test_worker_output_matches_inline() {
        let pool = AsyncChunkGenerator::new(generator(), 2, 8);
        pool.submit(task(5, -3)).expect("queue has room");
        let threaded = collect(&pool, 1).pop().expect("result");
        assert_eq!(threaded.buffer, generator().generate(ChunkCoord::new(5, 0, -3)));
    }

    #[test]
    fn test_inline_mode_completes_during_submit() {
        let pool = AsyncChunkGenerator::new(generator(), 0, 4);
        assert!(pool.is_inline());
        pool.submit(task(1, 1)).expect("inline never saturates");
        assert_eq!(pool.ready_count(), 1);
        let results = pool.drain_results();
        assert_eq!(results[0].coord, ChunkCoord::new(1, 0, 1));
        assert_eq!(pool.in_flight_count(), 0);
    }

    #[test]
    fn test_saturation_returns_task() {
        let pool = AsyncChunkGenerator::new(generator(), 1, 1);
        let mut rejected = 0;
        for x in 0..256 {
            if pool.submit(task(x, 0)).is_err() {
                rejected += 1;
            }
        }
        assert!(rejected > 0, "a pool bounded at one task must reject a burst of 256");
    }

    #[test]
    fn test_cancellation_is_tolerated() {
        let pool = AsyncChunkGenerator::new(generator(), 1, 16);
        let coord = ChunkCoord::new(50, 0, 50);
        let _ = pool.submit(GenerationTask { coord, priority: 0 });
        pool.cancel(&coord);
        assert!(!pool.is_pending(&coord));

        let deadline = Instant::now() + Duration::from_secs(10);
        while pool.in_flight_count() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        // The task may have finished before the flag was set; either way nothing is left running.
        assert_eq!(pool.in_flight_count(), 0);
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let mut pool = AsyncChunkGenerator::new(generator(), 2, 4);
        pool.shutdown();
        assert!(pool.is_inline(), "a shut-down pool falls back to inline submission");
    }
}
