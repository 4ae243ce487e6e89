//! The closed set of voxel materials, one byte each.

use serde::{Deserialize, Serialize};

/// A voxel material. `Air` is the empty sentinel every stage agrees on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum VoxelType {
    /// Empty space.
    #[default]
    Air = 0,
    /// Top soil layer.
    Grass = 1,
    /// Sub-surface soil.
    Dirt = 2,
    /// Bedrock below the soil layers.
    Stone = 3,
    /// Fills air between the terrain surface and the water level.
    Water = 4,
}

impl VoxelType {
    /// Every variant in discriminant order.
    pub const ALL: [VoxelType; 5] = [
        Self::Air,
        Self::Grass,
        Self::Dirt,
        Self::Stone,
        Self::Water,
    ];

    /// Returns `true` for anything but air.
    #[inline]
    pub fn is_solid(self) -> bool {
        self != Self::Air
    }

    /// The on-disk byte.
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Linear RGBA vertex color used when the consumer has no material table.
    pub fn color(self) -> [f32; 4] {
        match self {
            Self::Air => [0.0, 0.0, 0.0, 0.0],
            Self::Grass => [0.30, 0.62, 0.22, 1.0],
            Self::Dirt => [0.45, 0.32, 0.20, 1.0],
            Self::Stone => [0.50, 0.50, 0.52, 1.0],
            Self::Water => [0.18, 0.35, 0.75, 0.7],
        }
    }
}

impl TryFrom<u8> for VoxelType {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(byte as usize).copied().ok_or(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_roundtrip_for_all_variants() {
        for voxel in VoxelType::ALL {
            assert_eq!(VoxelType::try_from(voxel.to_byte()), Ok(voxel));
        }
    }

    #[test]
    fn test_unknown_byte_rejected() {
        assert_eq!(VoxelType::try_from(5), Err(5));
        assert_eq!(VoxelType::try_from(255), Err(255));
    }

    #[test]
    fn test_air_is_default_and_not_solid() {
        assert_eq!(VoxelType::default(), VoxelType::Air);
        assert!(!VoxelType::Air.is_solid());
        assert!(VoxelType::Water.is_solid());
    }
}
