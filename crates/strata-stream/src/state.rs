/// Where a chunk coordinate currently sits in the streaming lifecycle.
///
/// Coordinates the streamer knows nothing about are `Unrequested`; that state
/// is represented by `None` from [`Streamer::chunk_state`](crate::Streamer::chunk_state).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Waiting in the load queue.
    Queued,
    /// Submitted to the generation pool.
    Generating,
    /// Voxels ready, initial mesh in flight.
    Meshing,
    /// Resident with geometry.
    Active,
    /// Compressed in the memory tier.
    MemoryCached,
    /// Persisted in the disk tier only.
    DiskCached,
}

impl ChunkState {
    /// Returns `true` for states that hold resident voxel data or are about to.
    pub fn is_resident(self) -> bool {
        matches!(self, Self::Generating | Self::Meshing | Self::Active)
    }
}
