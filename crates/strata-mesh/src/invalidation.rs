//! Mesh staleness tracking: compares the voxel data version a mesh was built
//! from against the chunk's current version.

/// Per-chunk mesh bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkMeshState {
    /// Data version the current render mesh was built from.
    pub meshed_version: u64,
    /// Data version the current collision mesh was built from.
    pub collision_version: u64,
    /// A render remesh is queued or in flight.
    pub remesh_pending: bool,
    /// A collision rebuild is queued or in flight.
    pub collision_pending: bool,
}

impl ChunkMeshState {
    /// State for a chunk whose meshes were both built from `version`.
    pub fn meshed_at(version: u64) -> Self {
        Self {
            meshed_version: version,
            collision_version: version,
            remesh_pending: false,
            collision_pending: false,
        }
    }

    /// Returns `true` if the render mesh lags the data.
    pub fn is_stale(&self, current_data_version: u64) -> bool {
        self.meshed_version != current_data_version
    }

    /// Returns `true` if a render remesh should be scheduled.
    pub fn needs_remesh(&self, current_data_version: u64) -> bool {
        self.is_stale(current_data_version) && !self.remesh_pending
    }

    /// Returns `true` if a collision rebuild should be scheduled.
    pub fn needs_collision(&self, current_data_version: u64) -> bool {
        self.collision_version != current_data_version && !self.collision_pending
    }

    /// Records a finished render remesh. Returns `false` for a result older
    /// than the mesh already in place.
    pub fn complete_remesh(&mut self, data_version: u64) -> bool {
        self.remesh_pending = false;
        if data_version < self.meshed_version {
            return false;
        }
        self.meshed_version = data_version;
        true
    }

    /// Records a finished collision rebuild. Returns `false` for an outdated result.
    pub fn complete_collision(&mut self, data_version: u64) -> bool {
        self.collision_pending = false;
        if data_version < self.collision_version {
            return false;
        }
        self.collision_version = data_version;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_makes_mesh_stale() {
        let state = ChunkMeshState::meshed_at(3);
        assert!(!state.is_stale(3));
        assert!(state.needs_remesh(4));
    }

    #[test]
    fn test_pending_remesh_not_resubmitted() {
        let mut state = ChunkMeshState::meshed_at(1);
        state.remesh_pending = true;
        assert!(!state.needs_remesh(2));
    }

    #[test]
    fn test_out_of_order_result_rejected() {
        let mut state = ChunkMeshState::meshed_at(5);
        assert!(!state.complete_remesh(4));
        assert_eq!(state.meshed_version, 5);
        assert!(state.complete_remesh(7));
        assert_eq!(state.meshed_version, 7);
    }

    #[test]
    fn test_collision_tracked_separately() {
        let mut state = ChunkMeshState::meshed_at(1);
        assert!(state.complete_remesh(2));
        assert!(state.needs_collision(2));
        state.collision_pending = true;
        assert!(!state.needs_collision(2));
        assert!(state.complete_collision(2));
        assert!(!state.needs_collision(2));
    }
}
