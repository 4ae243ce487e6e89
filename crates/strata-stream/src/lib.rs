//! Chunk streaming around a moving observer.
//!
//! The [`Streamer`] keeps the chunks within the load radius resident and
//! meshed, unloads chunks past the unload radius into a two-tier cache
//! (compressed LRU in memory, files on disk for edited chunks), enforces a
//! resident memory ceiling, and runs edit-triggered remeshes and collision
//! rebuilds on their own budgeted queues.

mod budget;
mod burst;
mod disk_tier;
mod error;
mod events;
mod memory_budget;
mod memory_tier;
mod queue;
mod record;
mod state;
mod stats;
mod streamer;


pub use budget::FrameBudget;
pub use burst::{BurstController, predicted_position};
pub use disk_tier::DiskTier;
pub use error::StreamError;
pub use events::{ChunkEvent, ChunkTransform};
pub use memory_budget::{ChunkMemoryUsage, MemoryBudgetTracker, select_evictions};
pub use memory_tier::{CachedChunk, MemoryTier};
pub use queue::ChunkQueue;
pub use state::ChunkState;
pub use stats::StreamStats;
pub use streamer::{EditOutcome, Streamer};
