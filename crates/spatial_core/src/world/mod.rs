//! Entities and the world that drives them
//!
//! - [`entity`] - entity state and the generation-checked entity store
//! - [`entity_types`] - per-world registry of entity type names
//! - [`context`] - the view of the store handed to handlers
//! - [`world_config`] - trigger boxes and waypoints exported by the level editor
//! - [`world`] - the frame loop tying every subsystem together

pub mod context;
pub mod entity;
pub mod entity_types;
#[allow(clippy::module_inception)]
pub mod world;
pub mod world_config;

pub use context::HandlerContext;
pub use entity::{Entity, EntityFlags, EntityHandle, EntityStore, Size, SubsystemIndices};
pub use entity_types::{EntityTypeId, EntityTypeRegistry};
pub use world::World;
pub use world_config::{TriggerBoxConfig, WorldConfigError, WorldConfiguration};
