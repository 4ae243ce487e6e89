use std::fmt;
use std::time::Duration;

/// Counters for one tick, or accumulated over many.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Coordinates newly added to the load queue.
    pub enqueued: u32,
    /// Loads dispatched (cache reconstruction or generation).
    pub dispatched: u32,
    /// Chunks that became active.
    pub activated: u32,
    /// Chunks unloaded for leaving the unload radius.
    pub unloaded: u32,
    /// Queued or in-flight loads dropped because the observer moved away.
    pub cancelled: u32,
    /// Chunks unloaded to honor the memory ceiling.
    pub forced_evictions: u32,
    /// Loads served from the memory tier.
    pub memory_hits: u32,
    /// Loads served from the disk tier.
    pub disk_hits: u32,
    /// Loads that went to the terrain generator.
    pub regenerated: u32,
    /// Render remeshes submitted.
    pub remeshed: u32,
    /// Collision rebuilds submitted.
    pub collision_rebuilt: u32,
    /// Mesh or collision results dropped as outdated.
    pub stale_results: u32,
    /// Wall-clock time of the streaming stage.
    pub stream_time: Duration,
    /// Whether a teleport burst raised this tick's budget.
    pub burst: bool,
}

impl StreamStats {
    /// Adds `other` into `self`.
    pub fn accumulate(&mut self, other: &StreamStats) {
        self.enqueued += other.enqueued;
        self.dispatched += other.dispatched;
        self.activated += other.activated;
        self.unloaded += other.unloaded;
        self.cancelled += other.cancelled;
        self.forced_evictions += other.forced_evictions;
        self.memory_hits += other.memory_hits;
        self.disk_hits += other.disk_hits;
        self.regenerated += other.regenerated;
        self.remeshed += other.remeshed;
        self.collision_rebuilt += other.collision_rebuilt;
        self.stale_results += other.stale_results;
        self.stream_time += other.stream_time;
        self.burst |= other.burst;
    }
}

impl fmt::Display for StreamStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dispatched={} activated={} unloaded={} evicted={} hits(mem={} disk={}) regen={} remesh={} collision={} stream={:.2}ms",
            self.dispatched,
            self.activated,
            self.unloaded,
            self.forced_evictions,
            self.memory_hits,
            self.disk_hits,
            self.regenerated,
            self.remeshed,
            self.collision_rebuilt,
            self.stream_time.as_secs_f64() * 1000.0,
        )
    }
}
