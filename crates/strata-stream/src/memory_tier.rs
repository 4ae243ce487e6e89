//! In-memory LRU tier holding compressed buffers of unloaded chunks.

use lru::LruCache;
use strata_config::CacheCapacity;
use strata_voxel::{ChunkCoord, VoxelDelta};

/// A chunk parked in the memory tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedChunk {
    /// Output of [`strata_voxel::encode_chunk`].
    pub bytes: Vec<u8>,
    /// Edits since generation, kept decoded so eviction without a disk tier
    /// can retain them cheaply.
    pub deltas: Vec<VoxelDelta>,
    /// Edits not yet persisted to disk.
    pub dirty: bool,
}

impl CachedChunk {
    /// Bytes charged against a byte-bounded capacity.
    pub fn memory_bytes(&self) -> usize {
        self.bytes.len() + self.deltas.len() * std::mem::size_of::<VoxelDelta>()
    }
}

/// Recency-ordered cache bounded by entry count or by bytes.
pub struct MemoryTier {
    entries: LruCache<ChunkCoord, CachedChunk>,
    capacity: CacheCapacity,
    bytes: usize,
}

impl MemoryTier {
    /// Creates an empty tier.
    pub fn new(capacity: CacheCapacity) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity,
            bytes: 0,
        }
    }

    /// Inserts an entry as most recently used. Returns the entries pushed out
    /// to honor the capacity, least recently used first. The new entry itself
    /// is returned when it alone exceeds a byte capacity.
    pub fn insert(&mut self, coord: ChunkCoord, chunk: CachedChunk) -> Vec<(ChunkCoord, CachedChunk)> {
        self.bytes += chunk.memory_bytes();
        if let Some(old) = self.entries.put(coord, chunk) {
            self.bytes -= old.memory_bytes();
        }

        let mut evicted = Vec::new();
        while self.over_capacity() {
            let Some((coord, chunk)) = self.entries.pop_lru() else {
                break;
            };
            self.bytes -= chunk.memory_bytes();
            evicted.push((coord, chunk));
        }
        evicted
    }

    /// Removes and returns the entry for `coord`.
    pub fn take(&mut self, coord: &ChunkCoord) -> Option<CachedChunk> {
        let chunk = self.entries.pop(coord)?;
        self.bytes -= chunk.memory_bytes();
        Some(chunk)
    }

    /// Returns `true` if `coord` is cached. Does not touch recency.
    pub fn contains(&self, coord: &ChunkCoord) -> bool {
        self.entries.contains(coord)
    }

    /// Looks at an entry without touching recency.
    pub fn peek(&self, coord: &ChunkCoord) -> Option<&CachedChunk> {
        self.entries.peek(coord)
    }

    /// Mutable access to every dirty entry, for flushing.
    pub fn dirty_entries_mut(&mut self) -> impl Iterator<Item = (&ChunkCoord, &mut CachedChunk)> {
        self.entries.iter_mut().filter(|(_, chunk)| chunk.dirty)
    }

    /// Number of cached chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently held.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    fn over_capacity(&self) -> bool {
        match self.capacity {
            CacheCapacity::Entries(max) => self.entries.len() > max,
            CacheCapacity::Bytes(max) => self.bytes > max,
        }
    }
}
