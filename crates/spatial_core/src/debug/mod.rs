//! Debug visualization
//!
//! A narrow drawing interface the world describes its spatial state
//! through, plus a recording implementation for tools and tests.

pub mod draw;

pub use draw::{colors, DebugDraw, DebugDrawSystem, DebugShape, DebugShapeId, RecordedShape};
