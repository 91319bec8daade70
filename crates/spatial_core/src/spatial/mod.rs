//! Spatial partitioning data structures
//!
//! The level's static geometry lives in an [`Octree`] that is loaded once and
//! then queried with swept segments by the collision engine.

pub mod octree;

pub use octree::{Octree, OctreeError, OctreeNode, OCTREE_MAGIC, OCTREE_VERSION};
