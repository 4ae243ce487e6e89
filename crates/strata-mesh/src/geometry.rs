//! Mesh output types. Positions are chunk-local, in voxel units; the
//! consumer applies the chunk's world transform.

use strata_voxel::VoxelType;

use crate::face_direction::FaceDirection;

/// Metadata for a single merged quad, used for statistics and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadInfo {
    /// Which face direction this quad belongs to.
    pub direction: FaceDirection,
    /// Material of the merged faces.
    pub voxel: VoxelType,
    /// Extent along the sweep's u axis, in voxels.
    pub width: u32,
    /// Extent along the sweep's v axis, in voxels.
    pub height: u32,
}

/// Render geometry for one chunk plus its optional collision shape.
///
/// Replaced wholesale on every remesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkGeometry {
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex face normals.
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates, tiled once per voxel across merged quads.
    pub uvs: Vec<[f32; 2]>,
    /// Per-vertex material colors.
    pub colors: Vec<[f32; 4]>,
    /// Triangle list, counter-clockwise from the front.
    pub indices: Vec<u32>,
    /// One entry per emitted quad.
    pub quads: Vec<QuadInfo>,
    /// Lower-resolution collision shape, once baked.
    pub collision: Option<CollisionMesh>,
}

impl ChunkGeometry {
    /// Creates an empty geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of merged quads.
    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    /// Counts quads facing `direction`.
    pub fn count_quads_for_direction(&self, direction: FaceDirection) -> usize {
        self.quads.iter().filter(|q| q.direction == direction).count()
    }

    /// `true` when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Estimated heap footprint in bytes, collision included.
    pub fn memory_bytes(&self) -> usize {
        self.positions.len() * std::mem::size_of::<[f32; 3]>()
            + self.normals.len() * std::mem::size_of::<[f32; 3]>()
            + self.uvs.len() * std::mem::size_of::<[f32; 2]>()
            + self.colors.len() * std::mem::size_of::<[f32; 4]>()
            + self.indices.len() * std::mem::size_of::<u32>()
            + self.quads.len() * std::mem::size_of::<QuadInfo>()
            + self.collision.as_ref().map_or(0, CollisionMesh::memory_bytes)
    }

    /// Appends one quad.
    ///
    /// `layer`, `u`, `v` are voxel coordinates in the direction's sweep
    /// frame; `w` and `h` are the extents along u and v.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn push_quad(
        &mut self,
        direction: FaceDirection,
        layer: usize,
        u: usize,
        v: usize,
        w: usize,
        h: usize,
        voxel: VoxelType,
    ) {
        let base = self.positions.len() as u32;
        let corners = quad_corners(direction, layer, u, v, w, h, 1.0);
        let normal = direction.normal();
        let color = voxel.color();
        let uvs = [
            [0.0, 0.0],
            [w as f32, 0.0],
            [w as f32, h as f32],
            [0.0, h as f32],
        ];

        self.positions.extend_from_slice(&corners);
        self.normals.extend_from_slice(&[normal; 4]);
        self.uvs.extend_from_slice(&uvs);
        self.colors.extend_from_slice(&[color; 4]);
        self.indices
            .extend_from_slice(&quad_indices(base, direction.uv_is_front_facing()));
        self.quads.push(QuadInfo {
            direction,
            voxel,
            width: w as u32,
            height: h as u32,
        });
    }
}

/// Collision triangles: positions and indices only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionMesh {
    /// Vertex positions in chunk-local voxel units.
    pub positions: Vec<[f32; 3]>,
    /// Triangle list.
    pub indices: Vec<u32>,
}

impl CollisionMesh {
    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// `true` when there is nothing to collide with.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Estimated heap footprint in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.positions.len() * std::mem::size_of::<[f32; 3]>()
            + self.indices.len() * std::mem::size_of::<u32>()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn push_quad(
        &mut self,
        direction: FaceDirection,
        layer: usize,
        u: usize,
        v: usize,
        w: usize,
        h: usize,
        scale: f32,
    ) {
        let base = self.positions.len() as u32;
        self.positions
            .extend_from_slice(&quad_corners(direction, layer, u, v, w, h, scale));
        self.indices
            .extend_from_slice(&quad_indices(base, direction.uv_is_front_facing()));
    }
}

/// Corners `(u, v)`, `(u+w, v)`, `(u+w, v+h)`, `(u, v+h)` in xyz.
/// Positive faces sit on the far side of their voxel.
fn quad_corners(
    direction: FaceDirection,
    layer: usize,
    u: usize,
    v: usize,
    w: usize,
    h: usize,
    scale: f32,
) -> [[f32; 3]; 4] {
    let (layer_axis, u_axis, v_axis) = direction.sweep_axes();
    let layer_pos = if direction.is_positive() {
        layer as f32 + 1.0
    } else {
        layer as f32
    };
    let (u0, v0) = (u as f32, v as f32);
    let (u1, v1) = ((u + w) as f32, (v + h) as f32);

    [(u0, v0), (u1, v0), (u1, v1), (u0, v1)].map(|(cu, cv)| {
        let mut pos = [0.0_f32; 3];
        pos[layer_axis] = layer_pos * scale;
        pos[u_axis] = cu * scale;
        pos[v_axis] = cv * scale;
        pos
    })
}

fn quad_indices(base: u32, front_facing: bool) -> [u32; 6] {
    if front_facing {
        [base, base + 1, base + 2, base, base + 2, base + 3]
    } else {
        [base, base + 2, base + 1, base, base + 3, base + 2]
    }
}
