//! Spatial partitioning data structures
//!
//! The octree backs the entity tree's range queries. The space holds the
//! per-entity proxy spheres that are allocated lazily on promotion and kept
//! current through batched transactions.

mod octree;
mod space;

pub use octree::{Octree, OctreeConfig, OctreeEntity, OctreeNode};
pub use space::{Space, SpaceIndex, SpaceOp, SpaceProxy, SpaceTransaction};
