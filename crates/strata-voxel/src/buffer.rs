//! Dense per-chunk voxel storage.

use serde::{Deserialize, Serialize};

use crate::coord::LocalPos;
use crate::voxel_type::VoxelType;

/// A dense, row-major voxel array for one chunk of side `size`.
///
/// Index layout is `x + y * size + z * size * size`. The length is always
/// exactly `size³`; there is no way to construct a partial buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VoxelBuffer {
    size: usize,
    voxels: Vec<VoxelType>,
}

impl VoxelBuffer {
    /// An all-air buffer.
    pub fn new_air(size: usize) -> Self {
        Self::filled(size, VoxelType::Air)
    }

    /// A buffer with every voxel set to `voxel`.
    pub fn filled(size: usize, voxel: VoxelType) -> Self {
        Self {
            size,
            voxels: vec![voxel; size * size * size],
        }
    }

    /// Wraps an existing vector. Returns it back if the length is not `size³`.
    pub fn from_vec(size: usize, voxels: Vec<VoxelType>) -> Result<Self, Vec<VoxelType>> {
        if voxels.len() == size * size * size {
            Ok(Self { size, voxels })
        } else {
            Err(voxels)
        }
    }

    /// Side length in voxels.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total voxel count (`size³`).
    #[inline]
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    /// Always `false` for a nonzero size.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Linear index of a local position.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.size + z * self.size * self.size
    }

    /// Local position of a linear index.
    #[inline]
    pub fn position(&self, index: usize) -> LocalPos {
        let s = self.size;
        (index % s, (index / s) % s, index / (s * s))
    }

    /// Voxel at a local position. Panics when out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> VoxelType {
        self.voxels[self.index(x, y, z)]
    }

    /// Voxel at signed local coordinates, or `None` outside the chunk.
    #[inline]
    pub fn get_checked(&self, x: i32, y: i32, z: i32) -> Option<VoxelType> {
        let s = self.size as i32;
        if x < 0 || y < 0 || z < 0 || x >= s || y >= s || z >= s {
            return None;
        }
        Some(self.get(x as usize, y as usize, z as usize))
    }

    /// Sets a voxel. Returns the previous value.
    pub fn set(&mut self, x: usize, y: usize, z: usize, voxel: VoxelType) -> VoxelType {
        let idx = self.index(x, y, z);
        std::mem::replace(&mut self.voxels[idx], voxel)
    }

    /// Sets a voxel by linear index. Out-of-range indices are ignored.
    pub fn set_index(&mut self, index: usize, voxel: VoxelType) -> Option<VoxelType> {
        match self.voxels.get_mut(index) {
            Some(slot) => Some(std::mem::replace(slot, voxel)),
            None => {
                tracing::warn!(index, len = self.voxels.len(), "voxel index out of bounds");
                None
            }
        }
    }

    /// Read-only view of the raw voxels.
    pub fn as_slice(&self) -> &[VoxelType] {
        &self.voxels
    }

    /// Mutable view of the raw voxels, for parallel fills.
    pub fn as_mut_slice(&mut self) -> &mut [VoxelType] {
        &mut self.voxels
    }

    /// Returns `true` if every voxel is air.
    pub fn is_all_air(&self) -> bool {
        self.voxels.iter().all(|v| *v == VoxelType::Air)
    }

    /// Number of non-air voxels.
    pub fn solid_count(&self) -> usize {
        self.voxels.iter().filter(|v| v.is_solid()).count()
    }

    /// One byte per voxel.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.voxels.iter().map(|v| v.to_byte()).collect()
    }

    /// Estimated heap footprint in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.voxels.len() * std::mem::size_of::<VoxelType>()
    }
}

/// A single recorded edit: linear voxel index and its new value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelDelta {
    /// Linear index inside the chunk buffer.
    pub index: u32,
    /// Voxel written at that index.
    pub voxel: VoxelType,
}

impl VoxelDelta {
    /// Bytes occupied by one delta in the chunk codec.
    pub const ENCODED_LEN: usize = 5;

    /// Creates a delta.
    pub fn new(index: u32, voxel: VoxelType) -> Self {
        Self { index, voxel }
    }
}

/// Replays deltas in order; later entries win.
pub fn apply_deltas(buffer: &mut VoxelBuffer, deltas: &[VoxelDelta]) {
    for delta in deltas {
        buffer.set_index(delta.index as usize, delta.voxel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_is_exactly_cubed() {
        let buf = VoxelBuffer::new_air(16);
        assert_eq!(buf.len(), 16 * 16 * 16);
        assert!(buf.is_all_air());
    }

    #[test]
    fn test_from_vec_rejects_partial() {
        assert!(VoxelBuffer::from_vec(4, vec![VoxelType::Air; 63]).is_err());
        assert!(VoxelBuffer::from_vec(4, vec![VoxelType::Air; 64]).is_ok());
    }

    #[test]
    fn test_row_major_layout() {
        let mut buf = VoxelBuffer::new_air(8);
        buf.set(1, 2, 3, VoxelType::Stone);
        assert_eq!(buf.as_slice()[1 + 2 * 8 + 3 * 64], VoxelType::Stone);
        assert_eq!(buf.position(1 + 2 * 8 + 3 * 64), (1, 2, 3));
    }

    #[test]
    fn test_get_checked_bounds() {
        let buf = VoxelBuffer::filled(4, VoxelType::Dirt);
        assert_eq!(buf.get_checked(3, 3, 3), Some(VoxelType::Dirt));
        assert_eq!(buf.get_checked(-1, 0, 0), None);
        assert_eq!(buf.get_checked(0, 4, 0), None);
    }

    #[test]
    fn test_deltas_replay_in_order() {
        let mut buf = VoxelBuffer::new_air(4);
        let deltas = [
            VoxelDelta::new(5, VoxelType::Stone),
            VoxelDelta::new(5, VoxelType::Grass),
            VoxelDelta::new(6, VoxelType::Water),
        ];
        apply_deltas(&mut buf, &deltas);
        assert_eq!(buf.as_slice()[5], VoxelType::Grass);
        assert_eq!(buf.as_slice()[6], VoxelType::Water);
        assert_eq!(buf.solid_count(), 2);
    }

    #[test]
    fn test_out_of_range_delta_ignored() {
        let mut buf = VoxelBuffer::new_air(2);
        apply_deltas(&mut buf, &[VoxelDelta::new(8, VoxelType::Stone)]);
        assert!(buf.is_all_air());
    }
}
