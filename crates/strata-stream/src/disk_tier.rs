//! Disk tier: one encoded file per chunk, `c_<x>_<y>_<z>.svck`.
//!
//! Only chunks carrying edits are ever written. A missing or corrupt file is
//! never an error for the caller; the chunk is regenerated from the seed.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use strata_voxel::{ChunkCoord, DecodedChunk, decode_chunk};
use tracing::{debug, warn};

use crate::error::StreamError;

const EXTENSION: &str = "svck";

/// Directory-backed chunk store with an index of the files it holds.
pub struct DiskTier {
    dir: PathBuf,
    index: FxHashSet<ChunkCoord>,
}

impl DiskTier {
    /// Opens `dir`, creating it if needed, and indexes existing chunk files.
    pub fn open(dir: &Path) -> Result<Self, StreamError> {
        fs::create_dir_all(dir).map_err(|source| StreamError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let entries = fs::read_dir(dir).map_err(|source| StreamError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let index: FxHashSet<ChunkCoord> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| parse_file_name(&entry.file_name().to_string_lossy()))
            .collect();
        debug!(dir = %dir.display(), chunks = index.len(), "opened disk tier");

        Ok(Self {
            dir: dir.to_path_buf(),
            index,
        })
    }

    /// The backing directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for `coord`.
    pub fn path(&self, coord: ChunkCoord) -> PathBuf {
        self.dir.join(file_name(coord))
    }

    /// Returns `true` if a file for `coord` is known.
    pub fn contains(&self, coord: &ChunkCoord) -> bool {
        self.index.contains(coord)
    }

    /// Number of indexed chunk files.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if no chunk files are indexed.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Writes encoded chunk bytes, replacing any previous file atomically.
    pub fn write(&mut self, coord: ChunkCoord, bytes: &[u8]) -> Result<(), StreamError> {
        let path = self.path(coord);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .and_then(|()| fs::rename(&tmp, &path))
            .map_err(|source| StreamError::Io {
                path: path.clone(),
                source,
            })?;
        self.index.insert(coord);
        Ok(())
    }

    /// Reads and decodes the file for `coord`.
    ///
    /// Returns `None` when there is no file, or when it cannot be read or
    /// decoded; a corrupt file is removed so it is not retried.
    pub fn read(&mut self, coord: ChunkCoord) -> Option<DecodedChunk> {
        if !self.index.contains(&coord) {
            return None;
        }
        let path = self.path(coord);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%coord, path = %path.display(), %err, "disk cache read failed, regenerating");
                self.index.remove(&coord);
                return None;
            }
        };
        match decode_chunk(&bytes) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(%coord, path = %path.display(), %err, "corrupt disk cache entry, regenerating");
                self.remove(coord);
                None
            }
        }
    }

    /// Deletes the file for `coord`, if any.
    pub fn remove(&mut self, coord: ChunkCoord) {
        if self.index.remove(&coord)
            && let Err(err) = fs::remove_file(self.path(coord))
        {
            debug!(%coord, %err, "failed to remove disk cache entry");
        }
    }
}

fn file_name(coord: ChunkCoord) -> String {
    format!("c_{}_{}_{}.{EXTENSION}", coord.x, coord.y, coord.z)
}

fn parse_file_name(name: &str) -> Option<ChunkCoord> {
    let stem = name.strip_prefix("c_")?.strip_suffix(".svck")?;
    let mut parts = stem.split('_').map(str::parse::<i32>);
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    let z = parts.next()?.ok()?;
    parts.next().is_none().then_some(ChunkCoord::new(x, y, z))
}

#[cfg(test)]
mod tests {
    use strata_voxel::{VoxelBuffer, VoxelDelta, VoxelType, encode_chunk};

    use super::*;

    fn sample() -> (VoxelBuffer, Vec<VoxelDelta>) {
        let mut buffer = VoxelBuffer::filled(8, VoxelType::Stone);
        buffer.set(1, 2, 3, VoxelType::Air);
        let index = buffer.index(1, 2, 3) as u32;
        (buffer, vec![VoxelDelta::new(index, VoxelType::Air)])
    }

    #[test]
    fn test_file_name_round_trip() {
        let coord = ChunkCoord::new(-3, 0, 12);
        assert_eq!(file_name(coord), "c_-3_0_12.svck");
        assert_eq!(parse_file_name(&file_name(coord)), Some(coord));
        assert_eq!(parse_file_name("c_1_2.svck"), None);
        assert_eq!(parse_file_name("c_1_2_3_4.svck"), None);
        assert_eq!(parse_file_name("notes.txt"), None);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut tier = DiskTier::open(dir.path()).unwrap();
        let (buffer, deltas) = sample();
        let coord = ChunkCoord::new(1, -1, 2);

        tier.write(coord, &encode_chunk(&buffer, &deltas)).unwrap();
        assert!(tier.contains(&coord));
        assert!(tier.path(coord).exists());

        let decoded = tier.read(coord).expect("entry decodes");
        assert_eq!(decoded.buffer, buffer);
        assert_eq!(decoded.deltas, deltas);
    }

    #[test]
    fn test_reopen_indexes_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let (buffer, deltas) = sample();
        {
            let mut tier = DiskTier::open(dir.path()).unwrap();
            tier.write(ChunkCoord::new(4, 5, 6), &encode_chunk(&buffer, &deltas)).unwrap();
        }
        std::fs::write(dir.path().join("unrelated.txt"), b"hello").unwrap();

        let tier = DiskTier::open(dir.path()).unwrap();
        assert_eq!(tier.len(), 1);
        assert!(tier.contains(&ChunkCoord::new(4, 5, 6)));
    }

    #[test]
    fn test_corrupt_file_falls_back_and_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut tier = DiskTier::open(dir.path()).unwrap();
        let (buffer, deltas) = sample();
        let coord = ChunkCoord::ZERO;
        let mut bytes = encode_chunk(&buffer, &deltas);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        tier.write(coord, &bytes).unwrap();

        assert!(tier.read(coord).is_none());
        assert!(!tier.contains(&coord));
        assert!(!tier.path(coord).exists());
    }

    #[test]
    fn test_missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let mut tier = DiskTier::open(dir.path()).unwrap();
        let (buffer, deltas) = sample();
        let coord = ChunkCoord::new(9, 9, 9);
        tier.write(coord, &encode_chunk(&buffer, &deltas)).unwrap();
        std::fs::remove_file(tier.path(coord)).unwrap();

        assert!(tier.read(coord).is_none());
        assert!(!tier.contains(&coord));
        assert!(tier.read(ChunkCoord::new(0, 1, 0)).is_none());
    }
}
