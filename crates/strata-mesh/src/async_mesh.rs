//! Asynchronous meshing pipeline: runs greedy and collision meshing on a
//! thread pool and delivers results through a channel.
//!
//! A task owns the buffer it meshes. For a freshly generated chunk that is
//! the chunk's only copy, moved in and handed back in the result; for a
//! resident chunk being remeshed it is a snapshot, tagged with the data
//! version it was taken at so stale results can be recognized.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use strata_voxel::{ChunkCoord, VoxelBuffer};

use crate::collision::collision_mesh;
use crate::geometry::{ChunkGeometry, CollisionMesh};
use crate::greedy::greedy_mesh;

/// Which meshes a task should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshKind {
    /// Render and collision geometry, for newly loaded chunks.
    Full,
    /// Render geometry only.
    Render,
    /// Collision geometry only.
    Collision,
}

/// A self-contained meshing task that can run on any thread.
#[derive(Debug)]
pub struct MeshingTask {
    /// The chunk this mesh is for.
    pub coord: ChunkCoord,
    /// Voxels to mesh, owned by the task.
    pub buffer: VoxelBuffer,
    /// Version of the chunk data when the task was created.
    pub data_version: u64,
    /// Meshes to produce.
    pub kind: MeshKind,
    /// Stride for the collision pass.
    pub collision_stride: usize,
}

/// The result of a completed meshing task.
#[derive(Debug)]
pub struct MeshingResult {
    /// The chunk this mesh is for.
    pub coord: ChunkCoord,
    /// The buffer the task was given, returned to the caller.
    pub buffer: VoxelBuffer,
    /// Version of the chunk data at snapshot time.
    pub data_version: u64,
    /// What was produced.
    pub kind: MeshKind,
    /// Render geometry (`Full` and `Render`). For `Full` the collision
    /// mesh is attached to it as well.
    pub geometry: Option<ChunkGeometry>,
    /// Collision geometry (`Collision` only).
    pub collision: Option<CollisionMesh>,
    /// Meshing time in microseconds.
    pub mesh_time_us: u64,
}

/// Meshing pipeline backed by a thread pool, or inline with zero workers.
///
/// The tick thread submits [`MeshingTask`]s via [`submit`](Self::submit)
/// and collects [`MeshingResult`]s via [`drain_results`](Self::drain_results).
pub struct MeshingPipeline {
    /// Channel sender for submitting tasks to workers. `None` runs inline.
    task_sender: Option<Sender<MeshingTask>>,
    result_sender: Sender<MeshingResult>,
    result_receiver: Receiver<MeshingResult>,
    worker_handles: Vec<JoinHandle<()>>,
    /// Maximum number of tasks that can be in flight simultaneously.
    budget: usize,
    in_flight: Arc<AtomicUsize>,
}

impl MeshingPipeline {
    /// Creates a pipeline with `worker_count` threads and at most `budget`
    /// tasks in flight. Zero workers means every task runs inside `submit`.
    pub fn new(worker_count: usize, budget: usize) -> Self {
        let budget = budget.max(1);
        let (task_tx, task_rx) = crossbeam_channel::bounded::<MeshingTask>(budget);
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let rx = task_rx.clone();
            let tx = result_tx.clone();
            let flight = Arc::clone(&in_flight);

            let spawned = std::thread::Builder::new()
                .name(format!("chunk-mesh-{i}"))
                .spawn(move || {
                    while let Ok(task) = rx.recv() {
                        let _ = tx.send(run_task(task));
                        flight.fetch_sub(1, Ordering::Relaxed);
                    }
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => tracing::warn!(%err, "failed to spawn meshing worker"),
            }
        }
        if worker_count > 0 && handles.is_empty() {
            tracing::warn!("no meshing workers available, meshing inline");
        }

        Self {
            task_sender: (!handles.is_empty()).then_some(task_tx),
            result_sender: result_tx,
            result_receiver: result_rx,
            worker_handles: handles,
            budget,
            in_flight,
        }
    }

    /// Returns `true` when tasks run on the submitting thread.
    pub fn is_inline(&self) -> bool {
        self.task_sender.is_none()
    }

    /// Submit a task. Returns it back when the budget is exhausted, so the
    /// caller never loses the buffer it moved in.
    #[allow(clippy::result_large_err)]
    pub fn submit(&self, task: MeshingTask) -> Result<(), MeshingTask> {
        let Some(sender) = &self.task_sender else {
            let _ = self.result_sender.send(run_task(task));
            return Ok(());
        };
        if self.in_flight.load(Ordering::Relaxed) >= self.budget {
            return Err(task);
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        sender.try_send(task).map_err(|e| {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            e.into_inner()
        })
    }

    /// Drain all completed results without blocking.
    pub fn drain_results(&self) -> Vec<MeshingResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_receiver.try_recv() {
            results.push(result);
        }
        results
    }

    /// Take one completed result, if any, without blocking.
    pub fn try_recv(&self) -> Option<MeshingResult> {
        self.result_receiver.try_recv().ok()
    }

    /// Block until one result arrives or `timeout` passes.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<MeshingResult> {
        self.result_receiver.recv_timeout(timeout).ok()
    }

    /// Tasks queued or executing on workers.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Results waiting to be drained.
    pub fn ready_count(&self) -> usize {
        self.result_receiver.len()
    }

    /// Stop accepting work and join the workers.
    pub fn shutdown(&mut self) {
        self.task_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for MeshingPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_task(task: MeshingTask) -> MeshingResult {
    let start = Instant::now();
    let (geometry, collision) = match task.kind {
        MeshKind::Full => {
            let mut geometry = greedy_mesh(&task.buffer);
            geometry.collision = Some(collision_mesh(&task.buffer, task.collision_stride));
            (Some(geometry), None)
        }
        MeshKind::Render => (Some(greedy_mesh(&task.buffer)), None),
        MeshKind::Collision => (None, Some(collision_mesh(&task.buffer, task.collision_stride))),
    };
    MeshingResult {
        coord: task.coord,
        buffer: task.buffer,
        data_version: task.data_version,
        kind: task.kind,
        geometry,
        collision,
        mesh_time_us: start.elapsed().as_micros() as u64,
    }
}

#[cfg(test)]
mod tests {
    use strata_voxel::VoxelType;

    use super::*;

    fn slab(size: usize) -> VoxelBuffer {
        let mut buf = VoxelBuffer::new_air(size);
        for z in 0..size {
            for x in 0..size {
                buf.set(x, 0, z, VoxelType::Stone);
            }
        }
        buf
    }

    fn task(x: i32, kind: MeshKind) -> MeshingTask {
        MeshingTask {
            coord: ChunkCoord::new(x, 0, 0),
            buffer: slab(16),
            data_version: x as u64,
            kind,
            collision_stride: 4,
        }
    }

    fn wait_for(pipeline: &MeshingPipeline, expected: usize) -> Vec<MeshingResult> {
        let mut results = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while results.len() < expected && Instant::now() < deadline {
            if let Some(r) = pipeline.recv_timeout(Duration::from_millis(20)) {
                results.push(r);
            }
        }
        results
    }

    #[test]
    fn test_async_mesh_produces_same_result_as_sync() {
        let pipeline = MeshingPipeline::new(2, 8);
        pipeline.submit(task(0, MeshKind::Render)).expect("room in budget");
        let result = wait_for(&pipeline, 1).pop().expect("result delivered");
        assert_eq!(result.geometry, Some(greedy_mesh(&slab(16))));
        assert_eq!(result.buffer, slab(16), "buffer comes back unchanged");
    }

    #[test]
    fn test_full_task_bakes_collision_into_geometry() {
        let pipeline = MeshingPipeline::new(0, 4);
        pipeline.submit(task(1, MeshKind::Full)).expect("inline");
        let result = pipeline.drain_results().pop().expect("inline result ready");
        let geometry = result.geometry.expect("render geometry");
        assert!(geometry.collision.is_some());
        assert!(result.collision.is_none());
    }

    #[test]
    fn test_collision_task_skips_render() {
        let pipeline = MeshingPipeline::new(0, 4);
        pipeline.submit(task(2, MeshKind::Collision)).expect("inline");
        let result = pipeline.drain_results().pop().expect("inline result ready");
        assert!(result.geometry.is_none());
        assert!(result.collision.is_some());
    }

    #[test]
    fn test_versions_round_trip() {
        let pipeline = MeshingPipeline::new(2, 16);
        for x in 0..5 {
            pipeline.submit(task(x, MeshKind::Render)).expect("room in budget");
        }
        let mut versions: Vec<u64> = wait_for(&pipeline, 5).iter().map(|r| r.data_version).collect();
        versions.sort_unstable();
        assert_eq!(versions, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_budget_exhaustion_returns_task() {
        let pipeline = MeshingPipeline::new(1, 1);
        let mut returned = None;
        for x in 0..256 {
            if let Err(task) = pipeline.submit(task(x, MeshKind::Full)) {
                returned = Some(task);
                break;
            }
        }
        let task = returned.expect("a budget of one must reject a burst");
        assert_eq!(task.buffer.size(), 16, "rejected task keeps its buffer");
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let mut pipeline = MeshingPipeline::new(2, 4);
        pipeline.shutdown();
        assert!(pipeline.is_inline());
        assert_eq!(pipeline.in_flight_count(), 0);
    }
}
