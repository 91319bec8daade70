//! Collision detection and resolution
//!
//! Swept-segment tests of moving entities against triangle geometry, with
//! contacts handed to per-entity [`CollisionHandler`]s.

pub mod collision;
pub mod collision_layers;
pub mod collision_system;

pub use collision::{CollisionHandler, CollisionMesh, MeshError, Segment, TaggedTriangle, Triangle, AABB};
pub use collision_layers::CollisionLayers;
pub use collision_system::{CollisionEngine, CollisionEntity, Contact, Direction, Geometry};
