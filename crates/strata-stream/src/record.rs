use std::collections::BTreeMap;
use std::sync::Arc;

use strata_mesh::{ChunkGeometry, ChunkMeshState, CollisionMesh};
use strata_voxel::{VoxelBuffer, VoxelDelta, VoxelType, apply_deltas};

use crate::memory_budget::ChunkMemoryUsage;
use crate::state::ChunkState;

/// Bookkeeping for one resident chunk (generating, meshing, or active).
#[derive(Debug)]
pub(crate) struct ChunkRecord {
    pub state: ChunkState,
    /// Raw voxels. `None` while the buffer is away in a generation or
    /// initial meshing task.
    pub buffer: Option<VoxelBuffer>,
    pub geometry: Option<Arc<ChunkGeometry>>,
    pub collision: Option<Arc<CollisionMesh>>,
    /// Every edit since generation, keyed by voxel index.
    pub edits: BTreeMap<u32, VoxelType>,
    /// Edits not yet persisted.
    pub dirty: bool,
    pub data_version: u64,
    pub mesh_state: ChunkMeshState,
    /// Tick of the last activation or edit.
    pub last_access: u64,
}

impl ChunkRecord {
    pub fn new(state: ChunkState, data_version: u64, tick: u64) -> Self {
        Self {
            state,
            buffer: None,
            geometry: None,
            collision: None,
            edits: BTreeMap::new(),
            dirty: false,
            data_version,
            mesh_state: ChunkMeshState::default(),
            last_access: tick,
        }
    }

    /// Edit history in index order.
    pub fn deltas(&self) -> Vec<VoxelDelta> {
        self.edits
            .iter()
            .map(|(&index, &voxel)| VoxelDelta::new(index, voxel))
            .collect()
    }

    /// Records `deltas` in the history and applies them to `buffer`.
    pub fn absorb(&mut self, buffer: &mut VoxelBuffer, deltas: &[VoxelDelta]) {
        apply_deltas(buffer, deltas);
        for delta in deltas {
            self.edits.insert(delta.index, delta.voxel);
        }
    }

    pub fn memory_usage(&self) -> ChunkMemoryUsage {
        ChunkMemoryUsage {
            voxel_bytes: self.buffer.as_ref().map_or(0, VoxelBuffer::memory_bytes),
            mesh_bytes: self.geometry.as_ref().map_or(0, |g| g.memory_bytes())
                + self.collision.as_ref().map_or(0, |c| c.memory_bytes()),
        }
    }
}
