//! Waypoint navigation
//!
//! - [`waypoint`] - the directed waypoint graph
//! - [`pathfinder`] - best-first search and distance queries over it
//! - [`controller`] - per-entity state machines steering along paths

pub mod controller;
pub mod pathfinder;
pub mod waypoint;

pub use controller::{AiController, AiEntity, AiError, AiState};
pub use pathfinder::{EdgeCost, PathError, Pathfinder};
pub use waypoint::{WayPoint, WayPointGraph, WayPointLink};
