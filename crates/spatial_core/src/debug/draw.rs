//! Debug drawing sink and a recording implementation
//!
//! The engines never render anything themselves. When a world is asked to
//! draw its debug view it describes waypoints, links, trigger boxes and
//! octree nodes through the [`DebugDraw`] trait; a renderer implements the
//! trait, and [`DebugDrawSystem`] records the shapes for inspection.

use std::collections::HashMap;

use crate::foundation::math::{Vec3, Vec4};
use crate::physics::collision::primitives::AABB;

/// Colors used by the built-in debug views
pub mod colors {
    use crate::foundation::math::Vec4;

    /// Waypoints
    pub const WAY_POINT: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);
    /// Waypoint links
    pub const LINK: Vec4 = Vec4::new(0.0, 0.6, 1.0, 1.0);
    /// Remaining AI path
    pub const AI_PATH: Vec4 = Vec4::new(1.0, 0.5, 0.0, 1.0);
    /// Trigger boxes
    pub const TRIGGER_BOX: Vec4 = Vec4::new(1.0, 1.0, 0.0, 1.0);
    /// Octree nodes
    pub const OCTREE_NODE: Vec4 = Vec4::new(0.5, 0.5, 0.5, 1.0);
    /// Collision triangles and segments
    pub const COLLISION: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);
}

/// Sink for debug geometry
pub trait DebugDraw {
    /// Line segment from `start` to `end`
    fn line(&mut self, start: Vec3, end: Vec3, color: Vec4);

    /// Wireframe axis-aligned box
    fn aabb(&mut self, bounds: &AABB, color: Vec4);

    /// Wireframe sphere
    fn sphere(&mut self, center: Vec3, radius: f32, color: Vec4);
}

/// Name under which a pinned shape is kept
pub type DebugShapeId = String;

/// Geometry of one recorded shape
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DebugShape {
    /// Segment
    Line {
        /// Start point
        start: Vec3,
        /// End point
        end: Vec3,
    },
    /// Wireframe sphere
    Sphere {
        /// Centre
        center: Vec3,
        /// Radius
        radius: f32,
    },
    /// Wireframe box
    Box(AABB),
}

/// A recorded shape with its color and remaining lifetime
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordedShape {
    /// What to draw
    pub shape: DebugShape,
    /// RGBA color
    pub color: Vec4,
    /// Seconds left; pinned shapes use infinity
    pub remaining: f32,
}

/// Recording debug-draw sink
///
/// Shapes drawn through [`DebugDraw`] live for `lifetime` seconds and are
/// aged by [`DebugDrawSystem::update`]. Pinned shapes stay until unpinned,
/// e.g. the level bounds drawn once at load.
pub struct DebugDrawSystem {
    shapes: Vec<RecordedShape>,
    pinned: HashMap<DebugShapeId, RecordedShape>,
    /// Lifetime of shapes drawn through the trait
    pub lifetime: f32,
    /// When false nothing is recorded
    pub enabled: bool,
}

impl DebugDrawSystem {
    /// Create a recorder whose shapes survive a single update
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            pinned: HashMap::new(),
            lifetime: f32::EPSILON,
            enabled: true,
        }
    }

    fn record(&mut self, shape: DebugShape, color: Vec4) {
        if self.enabled {
            self.shapes.push(RecordedShape {
                shape,
                color,
                remaining: self.lifetime,
            });
        }
    }

    /// Keep `shape` until [`Self::unpin`] is called with the same id
    pub fn pin(&mut self, id: impl Into<DebugShapeId>, shape: DebugShape, color: Vec4) {
        if self.enabled {
            let recorded = RecordedShape {
                shape,
                color,
                remaining: f32::INFINITY,
            };
            self.pinned.insert(id.into(), recorded);
        }
    }

    /// Drop a pinned shape
    pub fn unpin(&mut self, id: &str) {
        self.pinned.remove(id);
    }

    /// Age recorded shapes by `delta_time`, dropping expired ones
    pub fn update(&mut self, delta_time: f32) {
        self.shapes.retain_mut(|recorded| {
            recorded.remaining -= delta_time;
            recorded.remaining > 0.0
        });
    }

    /// Every live shape, pinned ones last
    pub fn shapes(&self) -> impl Iterator<Item = &RecordedShape> {
        self.shapes.iter().chain(self.pinned.values())
    }

    /// Number of live shapes drawn in `color`
    pub fn count_with_color(&self, color: Vec4) -> usize {
        self.shapes().filter(|recorded| recorded.color == color).count()
    }

    /// Number of live shapes
    pub fn shape_count(&self) -> usize {
        self.shapes.len() + self.pinned.len()
    }

    /// Forget everything, pinned shapes included
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.pinned.clear();
    }
}

impl Default for DebugDrawSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugDraw for DebugDrawSystem {
    fn line(&mut self, start: Vec3, end: Vec3, color: Vec4) {
        self.record(DebugShape::Line { start, end }, color);
    }

    fn aabb(&mut self, bounds: &AABB, color: Vec4) {
        self.record(DebugShape::Box(*bounds), color);
    }

    fn sphere(&mut self, center: Vec3, radius: f32, color: Vec4) {
        self.record(DebugShape::Sphere { center, radius }, color);
    }
}
