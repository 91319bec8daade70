//! Trigger boxes
//!
//! Axis-aligned boxes that report when entities of selected types enter
//! and leave them. Nothing is pushed back; see [`crate::physics`] for that.

pub mod bounding_box;
pub mod trigger_system;

pub use bounding_box::{AxisEntry, BoundingBox, SweptHit};
pub use trigger_system::{TriggerBoxEngine, TriggerBoxEntity, TriggerBoxHandler};
