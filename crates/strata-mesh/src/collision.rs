//! Collision geometry from a downsampled voxel grid.
//!
//! Each `stride³` block collapses to one cell that is solid when at least
//! half of its voxels are. The coarse grid is greedy-meshed with a single
//! material, so merges are limited only by shape.

use strata_voxel::{VoxelBuffer, VoxelType};

use crate::geometry::CollisionMesh;
use crate::greedy::greedy_quads;

/// Default collision stride: one cell per 4³ voxels.
pub const DEFAULT_COLLISION_STRIDE: usize = 4;

/// Majority-occupancy downsample. A stride that does not divide the chunk
/// size is rounded down to the nearest one that does.
pub fn downsample(buffer: &VoxelBuffer, stride: usize) -> VoxelBuffer {
    let size = buffer.size();
    let stride = effective_stride(size, stride);
    let coarse = size / stride;
    let threshold = (stride * stride * stride).div_ceil(2);
    let mut out = VoxelBuffer::new_air(coarse);

    for cz in 0..coarse {
        for cy in 0..coarse {
            for cx in 0..coarse {
                let mut solid = 0;
                for z in cz * stride..(cz + 1) * stride {
                    for y in cy * stride..(cy + 1) * stride {
                        for x in cx * stride..(cx + 1) * stride {
                            if buffer.get(x, y, z).is_solid() {
                                solid += 1;
                            }
                        }
                    }
                }
                if solid >= threshold {
                    out.set(cx, cy, cz, VoxelType::Stone);
                }
            }
        }
    }
    out
}

/// Collision triangles for `buffer`, in full-resolution voxel units.
pub fn collision_mesh(buffer: &VoxelBuffer, stride: usize) -> CollisionMesh {
    let stride = effective_stride(buffer.size(), stride);
    let coarse = downsample(buffer, stride);
    let mut mesh = CollisionMesh::default();
    greedy_quads(
        coarse.size(),
        |x, y, z| coarse.get(x, y, z),
        |direction, layer, u, v, w, h, _voxel| {
            mesh.push_quad(direction, layer, u, v, w, h, stride as f32);
        },
    );
    mesh
}

fn effective_stride(size: usize, stride: usize) -> usize {
    let mut stride = stride.clamp(1, size.max(1));
    while size % stride != 0 {
        stride -= 1;
    }
    stride
}
