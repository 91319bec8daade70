//! # Spatial Core
//!
//! Spatial interaction for a real-time 3D game: swept-segment collision
//! against triangle geometry, trigger boxes with enter/leave events, an
//! octree of the static level, and waypoint navigation for AI entities.
//!
//! ## Features
//!
//! - **Collision**: forward and ground probes against meshes or octrees
//! - **Trigger Boxes**: swept box tests with edge-triggered enter/leave
//! - **Octree**: binary level file loading and segment queries
//! - **Navigation**: waypoint graph, best-first pathfinding and steering
//! - **No Globals**: every registry is owned by a [`World`]
//!
//! ## Quick Start
//!
//! ```rust
//! use spatial_core::prelude::*;
//!
//! let mut world = World::new(EngineConfig::default());
//! world.way_points_mut().add_way_point(0, WayPoint::new(Vec3::zeros(), 0.5));
//! world.way_points_mut().add_way_point(1, WayPoint::new(Vec3::new(3.0, 0.0, 0.0), 0.5));
//! world.way_points_mut().add_way_point_link(WayPointLink::new(0, 1));
//!
//! let enemy = world.spawn(Entity::new("enemy", Vec3::zeros()));
//! let index = world.add_ai_entity(enemy)?;
//! world.update_destination_to(index, 1)?;
//!
//! for _ in 0..100 {
//!     world.begin_update();
//!     world.update(0.1);
//!     world.end_update();
//! }
//! assert_eq!(world.ai().state(index), Some(AiState::Deactivated));
//! # Ok::<(), CoreError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Shared configuration
pub mod core;
pub mod config;

pub mod foundation;
pub mod error;
pub mod debug;

// Subsystems, leaves first
pub mod spatial;
pub mod physics;
pub mod trigger;
pub mod ai;
pub mod world;

pub use error::{CoreError, CoreResult};
pub use world::World;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        ai::{AiController, AiState, EdgeCost, Pathfinder, WayPoint, WayPointGraph, WayPointLink},
        core::config::{AiConfig, CollisionConfig, Config, EngineConfig, TriggerConfig, WorldPaths},
        debug::{DebugDraw, DebugDrawSystem},
        error::{CoreError, CoreResult, RegistryError},
        foundation::math::{Vec3, Vec4},
        physics::{CollisionEngine, CollisionHandler, CollisionLayers, CollisionMesh, Geometry},
        spatial::Octree,
        trigger::{TriggerBoxEngine, TriggerBoxHandler},
        world::{Entity, EntityHandle, EntityTypeId, HandlerContext, Size, World, WorldConfiguration},
    };
}
