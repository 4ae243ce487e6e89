//! Greedy meshing: merges coplanar, same-type exposed faces into larger
//! rectangular quads.
//!
//! A face is exposed when its voxel is not air and the neighbor it faces is
//! air or outside the chunk. Chunks never look at their neighbors, so a
//! chunk's mesh depends only on its own buffer.

use strata_voxel::{VoxelBuffer, VoxelType, worst_case_vertex_count};

use crate::collision::collision_mesh;
use crate::face_direction::FaceDirection;
use crate::geometry::ChunkGeometry;

/// Converts sweep-frame coordinates back to concrete `(x, y, z)`.
///
/// `layer_axis`, `u_axis`, `v_axis` are 0=X, 1=Y, 2=Z.
fn axes_to_xyz(
    layer_axis: usize,
    u_axis: usize,
    v_axis: usize,
    layer: usize,
    u: usize,
    v: usize,
) -> (usize, usize, usize) {
    let mut coords = [0usize; 3];
    coords[layer_axis] = layer;
    coords[u_axis] = u;
    coords[v_axis] = v;
    (coords[0], coords[1], coords[2])
}

/// Runs the six greedy sweeps over a cube of side `size`, calling `emit`
/// once per merged rectangle with `(direction, layer, u, v, w, h, voxel)`.
///
/// For every direction and layer the exposed-face mask is built first, then
/// each set cell grows along u while the type matches, then along v while
/// the whole row matches, and the consumed cells are cleared so each face
/// is emitted exactly once.
pub fn greedy_quads<F, E>(size: usize, voxel_at: F, mut emit: E)
where
    F: Fn(usize, usize, usize) -> VoxelType,
    E: FnMut(FaceDirection, usize, usize, usize, usize, usize, VoxelType),
{
    let mut mask: Vec<Option<VoxelType>> = vec![None; size * size];

    for direction in FaceDirection::ALL {
        let (layer_axis, u_axis, v_axis) = direction.sweep_axes();

        for layer in 0..size {
            // Build the exposed-face mask for this layer.
            for v in 0..size {
                for u in 0..size {
                    let (x, y, z) = axes_to_xyz(layer_axis, u_axis, v_axis, layer, u, v);
                    let voxel = voxel_at(x, y, z);
                    let exposed = voxel.is_solid() && {
                        let (nx, ny, nz) = direction.offset(x as i32, y as i32, z as i32);
                        let s = size as i32;
                        nx < 0
                            || ny < 0
                            || nz < 0
                            || nx >= s
                            || ny >= s
                            || nz >= s
                            || !voxel_at(nx as usize, ny as usize, nz as usize).is_solid()
                    };
                    mask[v * size + u] = exposed.then_some(voxel);
                }
            }

            for v in 0..size {
                let mut u = 0;
                while u < size {
                    let Some(voxel) = mask[v * size + u] else {
                        u += 1;
                        continue;
                    };

                    // Extend width along u.
                    let mut w = 1;
                    while u + w < size && mask[v * size + u + w] == Some(voxel) {
                        w += 1;
                    }

                    // Extend height along v while the full row matches.
                    let mut h = 1;
                    'outer: while v + h < size {
                        for du in 0..w {
                            if mask[(v + h) * size + u + du] != Some(voxel) {
                                break 'outer;
                            }
                        }
                        h += 1;
                    }

                    for dv in 0..h {
                        mask[(v + dv) * size + u..(v + dv) * size + u + w].fill(None);
                    }

                    emit(direction, layer, u, v, w, h, voxel);
                    u += w;
                }
            }
        }
    }
}

/// Render geometry for a buffer. Collision is left unset.
pub fn greedy_mesh(buffer: &VoxelBuffer) -> ChunkGeometry {
    let mut geometry = ChunkGeometry::new();
    greedy_quads(
        buffer.size(),
        |x, y, z| buffer.get(x, y, z),
        |direction, layer, u, v, w, h, voxel| {
            geometry.push_quad(direction, layer, u, v, w, h, voxel);
        },
    );
    debug_assert!(
        geometry.vertex_count() <= worst_case_vertex_count(buffer.size()),
        "greedy mesh of {} vertices exceeds its worst-case bound",
        geometry.vertex_count()
    );
    geometry
}

/// Render geometry plus collision geometry at `collision_stride`.
pub fn mesh(buffer: &VoxelBuffer, collision_stride: usize) -> ChunkGeometry {
    let mut geometry = greedy_mesh(buffer);
    geometry.collision = Some(collision_mesh(buffer, collision_stride));
    geometry
}
