//! Meshing: greedy face merging for render geometry, a downsampled pass for
//! collision geometry, and a worker pool that runs both off the tick thread.

pub mod async_mesh;
pub mod collision;
pub mod face_direction;
pub mod geometry;
pub mod greedy;
pub mod invalidation;

pub use async_mesh::{MeshKind, MeshingPipeline, MeshingResult, MeshingTask};
pub use collision::{DEFAULT_COLLISION_STRIDE, collision_mesh, downsample};
pub use face_direction::FaceDirection;
pub use geometry::{ChunkGeometry, CollisionMesh, QuadInfo};
pub use greedy::{greedy_mesh, greedy_quads, mesh};
pub use invalidation::ChunkMeshState;
