//! Binary chunk codec shared by the memory and disk cache tiers.
//!
//! ## Binary Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic bytes `SVCK` |
//! | 4 | 1 | Format version (`u8`, currently 1) |
//! | 5 | 2 | Chunk side length (`u16`, little-endian) |
//! | 7 | 4 | CRC32 of every byte after this field (`u32`, little-endian) |
//! | 11 | 4 | Delta count N (`u32`, little-endian) |
//! | 15 | N×5 | Deltas: voxel index (`u32` LE) then voxel byte |
//! | 15+N×5 | rest | lz4 block of `size³` voxel bytes, uncompressed length prepended |
//!
//! The delta list is the chunk's edit history since generation, so a chunk
//! can also be rebuilt as regenerate-then-replay when only the deltas survive.

use crate::buffer::{VoxelBuffer, VoxelDelta};
use crate::voxel_type::VoxelType;

/// Magic bytes identifying the format.
const MAGIC: [u8; 4] = *b"SVCK";

/// Current format version.
const FORMAT_VERSION: u8 = 1;

/// Fixed header length: magic, version, size, checksum, delta count.
const HEADER_LEN: usize = 4 + 1 + 2 + 4 + 4;

/// Errors that can occur during chunk decoding.
#[derive(Debug, thiserror::Error)]
pub enum ChunkSerError {
    /// The data does not start with the expected magic bytes.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),
    /// The data is shorter than its header claims.
    #[error("data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum expected byte count.
        expected: usize,
        /// Actual byte count received.
        actual: usize,
    },
    /// Stored and computed CRC32 differ.
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum found in the header.
        stored: u32,
        /// Checksum of the bytes actually present.
        computed: u32,
    },
    /// Decompressed voxel count is not `size³`, or the size is zero.
    #[error("voxel payload size mismatch for chunk size {size}: {actual} voxels")]
    SizeMismatch {
        /// Chunk side length from the header.
        size: usize,
        /// Voxels present after decompression.
        actual: usize,
    },
    /// A byte does not name a known voxel type.
    #[error("invalid voxel byte: {0}")]
    InvalidVoxel(u8),
    /// A delta points outside the chunk.
    #[error("delta index {0} out of range")]
    DeltaOutOfRange(u32),
    /// The lz4 block is malformed.
    #[error("decompression failed: {0}")]
    Decompress(#[source] lz4_flex::block::DecompressError),
}

/// A decoded chunk: the voxel buffer and the edit history stored with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedChunk {
    /// The reconstructed buffer (edits already included).
    pub buffer: VoxelBuffer,
    /// Edits applied since generation.
    pub deltas: Vec<VoxelDelta>,
}

/// Encodes a buffer and its edit history.
pub fn encode_chunk(buffer: &VoxelBuffer, deltas: &[VoxelDelta]) -> Vec<u8> {
    let compressed = lz4_flex::compress_prepend_size(&buffer.to_bytes());

    let mut body = Vec::with_capacity(4 + deltas.len() * VoxelDelta::ENCODED_LEN + compressed.len());
    body.extend_from_slice(&(deltas.len() as u32).to_le_bytes());
    for delta in deltas {
        body.extend_from_slice(&delta.index.to_le_bytes());
        body.push(delta.voxel.to_byte());
    }
    body.extend_from_slice(&compressed);

    let mut out = Vec::with_capacity(HEADER_LEN - 4 + body.len());
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&(buffer.size() as u16).to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// Decodes bytes produced by [`encode_chunk`].
pub fn decode_chunk(data: &[u8]) -> Result<DecodedChunk, ChunkSerError> {
    if data.len() < 4 || data[0..4] != MAGIC {
        return Err(ChunkSerError::InvalidMagic);
    }
    if data.len() < HEADER_LEN {
        return Err(ChunkSerError::Truncated {
            expected: HEADER_LEN,
            actual: data.len(),
        });
    }
    let version = data[4];
    if version != FORMAT_VERSION {
        return Err(ChunkSerError::UnsupportedVersion(version));
    }

    let size = u16::from_le_bytes([data[5], data[6]]) as usize;
    let stored = u32::from_le_bytes([data[7], data[8], data[9], data[10]]);
    let body = &data[11..];
    let computed = crc32fast::hash(body);
    if stored != computed {
        return Err(ChunkSerError::ChecksumMismatch { stored, computed });
    }
    if size == 0 {
        return Err(ChunkSerError::SizeMismatch { size, actual: 0 });
    }
    let volume = size * size * size;

    let delta_count = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
    let deltas_end = 4 + delta_count * VoxelDelta::ENCODED_LEN;
    if body.len() < deltas_end {
        return Err(ChunkSerError::Truncated {
            expected: 11 + deltas_end,
            actual: data.len(),
        });
    }

    let mut deltas = Vec::with_capacity(delta_count);
    for raw in body[4..deltas_end].chunks_exact(VoxelDelta::ENCODED_LEN) {
        let index = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if index as usize >= volume {
            return Err(ChunkSerError::DeltaOutOfRange(index));
        }
        let voxel = VoxelType::try_from(raw[4]).map_err(ChunkSerError::InvalidVoxel)?;
        deltas.push(VoxelDelta { index, voxel });
    }

    let raw = lz4_flex::decompress_size_prepended(&body[deltas_end..])
        .map_err(ChunkSerError::Decompress)?;
    if raw.len() != volume {
        return Err(ChunkSerError::SizeMismatch {
            size,
            actual: raw.len(),
        });
    }
    let voxels = raw
        .into_iter()
        .map(|b| VoxelType::try_from(b).map_err(ChunkSerError::InvalidVoxel))
        .collect::<Result<Vec<_>, _>>()?;
    let buffer = VoxelBuffer::from_vec(size, voxels).map_err(|v| ChunkSerError::SizeMismatch {
        size,
        actual: v.len(),
    })?;

    Ok(DecodedChunk { buffer, deltas })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_buffer() -> VoxelBuffer {
        let mut buf = VoxelBuffer::new_air(8);
        for z in 0..8 {
            for x in 0..8 {
                buf.set(x, 0, z, VoxelType::Stone);
                buf.set(x, 1, z, VoxelType::Grass);
            }
        }
        buf
    }

    #[test]
    fn test_encode_decode_preserves_buffer_and_deltas() {
        let buf = sample_buffer();
        let deltas = vec![VoxelDelta::new(3, VoxelType::Air), VoxelDelta::new(100, VoxelType::Water)];
        let decoded = decode_chunk(&encode_chunk(&buf, &deltas)).expect("decode");
        assert_eq!(decoded.buffer, buf);
        assert_eq!(decoded.deltas, deltas);
    }

    #[test]
    fn test_uniform_chunk_compresses() {
        let buf = VoxelBuffer::filled(16, VoxelType::Stone);
        let bytes = encode_chunk(&buf, &[]);
        assert!(
            bytes.len() < buf.len() / 10,
            "uniform chunk should compress well, got {} bytes",
            bytes.len()
        );
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = encode_chunk(&sample_buffer(), &[]);
        bytes[0] = b'X';
        assert!(matches!(decode_chunk(&bytes), Err(ChunkSerError::InvalidMagic)));
        assert!(matches!(decode_chunk(&[]), Err(ChunkSerError::InvalidMagic)));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = encode_chunk(&sample_buffer(), &[]);
        bytes[4] = 9;
        assert!(matches!(
            decode_chunk(&bytes),
            Err(ChunkSerError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_truncated_header_rejected() {
        let bytes = encode_chunk(&sample_buffer(), &[]);
        assert!(matches!(
            decode_chunk(&bytes[..8]),
            Err(ChunkSerError::Truncated { expected: 15, actual: 8 })
        ));
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let mut bytes = encode_chunk(&sample_buffer(), &[]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            decode_chunk(&bytes),
            Err(ChunkSerError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_body_detected() {
        let bytes = encode_chunk(&sample_buffer(), &[VoxelDelta::new(1, VoxelType::Dirt)]);
        let short = &bytes[..bytes.len() - 4];
        assert!(decode_chunk(short).is_err());
    }
}
