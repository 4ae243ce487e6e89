//! Deterministic seeding and buffer fingerprints.

use std::hash::Hasher;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHasher;
use strata_voxel::VoxelBuffer;

/// The RNG that shuffles a seed's permutation table.
///
/// ChaCha8 produces the same stream on every platform, so a seed maps to
/// one table everywhere.
pub fn noise_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Platform-stable 64-bit fingerprint of a buffer's contents.
///
/// Equal buffers give equal fingerprints; used to compare worlds across
/// runs and hosts without shipping whole buffers.
pub fn buffer_fingerprint(buffer: &VoxelBuffer) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_usize(buffer.size());
    hasher.write(&buffer.to_bytes());
    hasher.finish()
}
