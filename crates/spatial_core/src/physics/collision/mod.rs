//! Collision geometry and narrow-phase tests
//!
//! - [`primitives`] - segments, boxes and the segment/triangle test
//! - [`mesh`] - world-space triangle soup built from indexed buffers
//! - [`handler`] - the callback trait games implement

pub mod handler;
pub mod mesh;
pub mod primitives;

pub use handler::CollisionHandler;
pub use mesh::{CollisionMesh, MeshError};
pub use primitives::{nearest_hit, NearestHit, Segment, SegmentHit, TaggedTriangle, Triangle, AABB};
