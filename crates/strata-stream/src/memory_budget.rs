//! Resident memory accounting and forced-eviction selection.
//!
//! Every resident chunk reports an estimate of its voxel and geometry
//! footprint. When the total exceeds the configured ceiling,
//! [`select_evictions`] picks chunks to drop, oldest-accessed first.

use rustc_hash::FxHashMap;
use strata_voxel::ChunkCoord;

/// Approximate memory held by one resident chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkMemoryUsage {
    /// Raw voxel buffer bytes.
    pub voxel_bytes: usize,
    /// Render and collision geometry bytes.
    pub mesh_bytes: usize,
}

impl ChunkMemoryUsage {
    /// Voxel plus geometry bytes.
    pub fn total(&self) -> usize {
        self.voxel_bytes + self.mesh_bytes
    }
}

/// Tracks resident memory against a hard ceiling.
#[derive(Debug)]
pub struct MemoryBudgetTracker {
    budget: usize,
    chunk_usage: FxHashMap<ChunkCoord, ChunkMemoryUsage>,
    total: usize,
}

impl MemoryBudgetTracker {
    /// Creates a tracker with a ceiling of `budget` bytes.
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            chunk_usage: FxHashMap::default(),
            total: 0,
        }
    }

    /// Records or replaces the usage of a resident chunk.
    pub fn on_chunk_loaded(&mut self, coord: ChunkCoord, usage: ChunkMemoryUsage) {
        if let Some(old) = self.chunk_usage.insert(coord, usage) {
            self.total -= old.total();
        }
        self.total += usage.total();
    }

    /// Forgets a chunk that left residency.
    pub fn on_chunk_unloaded(&mut self, coord: &ChunkCoord) {
        if let Some(usage) = self.chunk_usage.remove(coord) {
            self.total -= usage.total();
        }
    }

    /// Returns `true` if resident memory exceeds the ceiling.
    pub fn is_over_budget(&self) -> bool {
        self.total > self.budget
    }

    /// Bytes above the ceiling (0 when under).
    pub fn overage(&self) -> usize {
        self.total.saturating_sub(self.budget)
    }

    /// Estimated resident bytes.
    pub fn total_bytes(&self) -> usize {
        self.total
    }

    /// The ceiling.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Number of tracked chunks.
    pub fn tracked_count(&self) -> usize {
        self.chunk_usage.len()
    }

    /// Per-chunk usage.
    pub fn chunk_usage(&self) -> &FxHashMap<ChunkCoord, ChunkMemoryUsage> {
        &self.chunk_usage
    }
}

/// Chunks to evict, in eviction order, to bring usage under the ceiling.
///
/// `last_access` maps chunks to the tick they were last touched; untouched
/// chunks count as oldest. `protected` is never selected.
pub fn select_evictions(
    tracker: &MemoryBudgetTracker,
    last_access: &FxHashMap<ChunkCoord, u64>,
    protected: ChunkCoord,
) -> Vec<ChunkCoord> {
    if !tracker.is_over_budget() {
        return Vec::new();
    }

    let mut candidates: Vec<(u64, ChunkCoord, usize)> = tracker
        .chunk_usage()
        .iter()
        .filter(|(coord, _)| **coord != protected)
        .map(|(coord, usage)| {
            let tick = last_access.get(coord).copied().unwrap_or(0);
            (tick, *coord, usage.total())
        })
        .collect();
    // Ties broken by coordinate so the order is reproducible.
    candidates.sort_unstable_by_key(|&(tick, coord, _)| (tick, coord));

    let mut to_free = tracker.overage();
    let mut evictions = Vec::new();
    for (_, coord, bytes) in candidates {
        if to_free == 0 {
            break;
        }
        evictions.push(coord);
        to_free = to_free.saturating_sub(bytes);
    }
    evictions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(bytes: usize) -> ChunkMemoryUsage {
        ChunkMemoryUsage {
            voxel_bytes: bytes,
            mesh_bytes: 0,
        }
    }

    fn c(x: i32) -> ChunkCoord {
        ChunkCoord::new(x, 0, 0)
    }

    #[test]
    fn test_tracking_totals() {
        let mut tracker = MemoryBudgetTracker::new(1000);
        tracker.on_chunk_loaded(c(0), usage(300));
        tracker.on_chunk_loaded(c(1), usage(300));
        tracker.on_chunk_loaded(c(0), usage(500));
        assert_eq!(tracker.total_bytes(), 800);
        tracker.on_chunk_unloaded(&c(1));
        assert_eq!(tracker.total_bytes(), 500);
        assert_eq!(tracker.tracked_count(), 1);
    }

    #[test]
    fn test_under_budget_selects_nothing() {
        let mut tracker = MemoryBudgetTracker::new(1000);
        tracker.on_chunk_loaded(c(0), usage(400));
        assert!(select_evictions(&tracker, &FxHashMap::default(), c(0)).is_empty());
    }

    #[test]
    fn test_oldest_accessed_evicted_first() {
        let mut tracker = MemoryBudgetTracker::new(250);
        let mut access = FxHashMap::default();
        for x in 0..4 {
            tracker.on_chunk_loaded(c(x), usage(100));
            access.insert(c(x), 10 - x as u64);
        }
        // 400 bytes against 250: two evictions, the two least recently touched.
        let evictions = select_evictions(&tracker, &access, c(9));
        assert_eq!(evictions, vec![c(3), c(2)]);
    }

    #[test]
    fn test_protected_chunk_never_selected() {
        let mut tracker = MemoryBudgetTracker::new(0);
        let mut access = FxHashMap::default();
        tracker.on_chunk_loaded(c(0), usage(100));
        tracker.on_chunk_loaded(c(1), usage(100));
        access.insert(c(0), 0);
        access.insert(c(1), 5);
        let evictions = select_evictions(&tracker, &access, c(0));
        assert_eq!(evictions, vec![c(1)]);
    }
}
