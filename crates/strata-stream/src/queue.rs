//! Nearest-first chunk queues shared by the load, remesh, and collision stages.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashSet;
use strata_voxel::ChunkCoord;

/// Priority queue of chunk coordinates, ordered by squared distance to a
/// center. Removal is lazy: the dedup set is authoritative and stale heap
/// entries are skipped on dequeue.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    /// Min-heap: `(distance_squared, coord)`.
    queue: BinaryHeap<Reverse<(i64, ChunkCoord)>>,
    /// Coordinates currently queued.
    pending: FxHashSet<ChunkCoord>,
}

impl ChunkQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `coord` with its squared distance to `center`.
    ///
    /// Returns `false` if it was already queued.
    pub fn push(&mut self, coord: ChunkCoord, center: ChunkCoord) -> bool {
        if !self.pending.insert(coord) {
            return false;
        }
        self.queue.push(Reverse((coord.distance_sq(center), coord)));
        true
    }

    /// Dequeues the nearest coordinate.
    pub fn pop(&mut self) -> Option<ChunkCoord> {
        while let Some(Reverse((_, coord))) = self.queue.pop() {
            if self.pending.remove(&coord) {
                return Some(coord);
            }
        }
        None
    }

    /// Removes `coord`. Returns `true` if it was queued.
    pub fn remove(&mut self, coord: &ChunkCoord) -> bool {
        self.pending.remove(coord)
    }

    /// Returns `true` if `coord` is queued.
    pub fn contains(&self, coord: &ChunkCoord) -> bool {
        self.pending.contains(coord)
    }

    /// Drops every queued coordinate for which `keep` returns `false`.
    /// Returns the removed coordinates.
    pub fn retain(&mut self, mut keep: impl FnMut(&ChunkCoord) -> bool) -> Vec<ChunkCoord> {
        let removed: Vec<ChunkCoord> = self.pending.iter().filter(|c| !keep(*c)).copied().collect();
        for coord in &removed {
            self.pending.remove(coord);
        }
        if self.queue.len() > 2 * self.pending.len() + 64 {
            self.compact();
        }
        removed
    }

    /// Rebuilds priorities around a new center.
    pub fn reprioritize(&mut self, center: ChunkCoord) {
        self.queue = self
            .pending
            .iter()
            .map(|&c| Reverse((c.distance_sq(center), c)))
            .collect();
    }

    /// Number of queued coordinates.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Clears the queue.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending.clear();
    }

    fn compact(&mut self) {
        let pending = &self.pending;
        self.queue.retain(|Reverse((_, c))| pending.contains(c));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32) -> ChunkCoord {
        ChunkCoord::new(x, 0, 0)
    }

    #[test]
    fn test_orders_by_distance() {
        let mut queue = ChunkQueue::new();
        for x in [5, 2, 8, 1, 3] {
            queue.push(c(x), ChunkCoord::ZERO);
        }
        let mut order = Vec::new();
        while let Some(coord) = queue.pop() {
            order.push(coord.x);
        }
        assert_eq!(order, vec![1, 2, 3, 5, 8]);
    }

    #[test]
    fn test_duplicates_ignored() {
        let mut queue = ChunkQueue::new();
        assert!(queue.push(c(1), ChunkCoord::ZERO));
        assert!(!queue.push(c(1), ChunkCoord::ZERO));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_removed_entries_are_skipped() {
        let mut queue = ChunkQueue::new();
        queue.push(c(1), ChunkCoord::ZERO);
        queue.push(c(2), ChunkCoord::ZERO);
        assert!(queue.remove(&c(1)));
        assert_eq!(queue.pop(), Some(c(2)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_retain_reports_removed() {
        let mut queue = ChunkQueue::new();
        for x in 0..10 {
            queue.push(c(x), ChunkCoord::ZERO);
        }
        let mut removed = queue.retain(|coord| coord.x < 4);
        removed.sort_by_key(|coord| coord.x);
        assert_eq!(removed, (4..10).map(c).collect::<Vec<_>>());
        assert_eq!(queue.len(), 4);
        assert!(!queue.contains(&c(7)));
    }

    #[test]
    fn test_reprioritize_follows_new_center() {
        let mut queue = ChunkQueue::new();
        queue.push(c(0), ChunkCoord::ZERO);
        queue.push(c(10), ChunkCoord::ZERO);
        queue.reprioritize(c(9));
        assert_eq!(queue.pop(), Some(c(10)));
    }
}
