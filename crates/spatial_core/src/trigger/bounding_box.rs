//! Axis-aligned boxes for trigger tests
//!
//! A trigger box is an entity's position and half its [`Size`]. Two tests
//! are offered: a static overlap, and a swept test of a moving box against a
//! stationary one over a single frame.

use crate::foundation::math::{constants, utils, Vec3};
use crate::physics::collision::primitives::AABB;
use crate::world::entity::Size;

/// Box described by centre and half extents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Centre
    pub centre: Vec3,
    /// Half extents
    pub half: Vec3,
}

/// First contact of a swept box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweptHit {
    /// Time of entry within the frame; negative when already inside
    pub enter_time: f32,
    /// Normal of the face entered through
    pub normal: Vec3,
}

/// Entry along one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisEntry {
    /// Time the moving point enters the slab
    pub enter_time: f32,
    /// Sign of the entered face's normal on this axis
    pub normal_direction: f32,
}

impl BoundingBox {
    /// Box from centre and half extents
    pub fn new(centre: Vec3, half: Vec3) -> Self {
        Self { centre, half }
    }

    /// Box around an entity at `position` with full extents `size`
    pub fn from_size(position: Vec3, size: &Size) -> Self {
        Self::new(position, size.half_extents())
    }

    /// Gap between the boxes along x; negative when they overlap on x
    pub fn separation_x(&self, other: &Self) -> f32 {
        (self.centre.x - other.centre.x).abs() - (self.half.x + other.half.x)
    }

    /// Gap between the boxes along y
    pub fn separation_y(&self, other: &Self) -> f32 {
        (self.centre.y - other.centre.y).abs() - (self.half.y + other.half.y)
    }

    /// Gap between the boxes along z
    pub fn separation_z(&self, other: &Self) -> f32 {
        (self.centre.z - other.centre.z).abs() - (self.half.z + other.half.z)
    }

    /// Whether the boxes touch or overlap
    pub fn overlap(&self, other: &Self) -> bool {
        self.separation_x(other) <= 0.0 && self.separation_y(other) <= 0.0 && self.separation_z(other) <= 0.0
    }

    /// Minimum corner
    pub fn min(&self) -> Vec3 {
        self.centre - self.half
    }

    /// Maximum corner
    pub fn max(&self) -> Vec3 {
        self.centre + self.half
    }

    /// As a min/max box
    pub fn to_aabb(&self) -> AABB {
        AABB::new(self.min(), self.max())
    }

    /// Sweep `moving` by `velocity` for `frame_time` against `stationary`
    ///
    /// The stationary box is grown by the moving box's half extents so the
    /// moving box reduces to its centre point. The axis entered last gives
    /// the time and the normal.
    pub fn moving_to_stationary(stationary: &Self, moving: &Self, velocity: &Vec3, frame_time: f32) -> Option<SweptHit> {
        let grown = Self::new(stationary.centre, stationary.half + moving.half);
        let (min, max) = (grown.min(), grown.max());

        let x = Self::moving_check_in_axis(min.x, max.x, velocity.x, moving.centre.x, frame_time)?;
        let y = Self::moving_check_in_axis(min.y, max.y, velocity.y, moving.centre.y, frame_time)?;
        let z = Self::moving_check_in_axis(min.z, max.z, velocity.z, moving.centre.z, frame_time)?;

        let right = utils::right();
        let up = utils::up();
        let forward = utils::forward();

        let (entry, axis) = if x.enter_time < y.enter_time {
            if y.enter_time < z.enter_time {
                (z, forward)
            } else {
                (y, up)
            }
        } else if x.enter_time < z.enter_time {
            (z, forward)
        } else {
            (x, right)
        };

        Some(SweptHit {
            enter_time: entry.enter_time,
            normal: axis * entry.normal_direction,
        })
    }

    /// Slab test of a point starting at `start` moving at `velocity`
    ///
    /// With no velocity the point hits only if it already lies in
    /// `[min, max]`. Otherwise it hits when it enters within the frame or is
    /// inside at the start of it.
    pub fn moving_check_in_axis(min: f32, max: f32, velocity: f32, start: f32, frame_time: f32) -> Option<AxisEntry> {
        if velocity.abs() <= constants::EPSILON {
            return (start >= min && start <= max).then_some(AxisEntry {
                enter_time: 0.0,
                normal_direction: 0.0,
            });
        }

        let mut enter_time = (min - start) / velocity;
        let mut leave_time = (max - start) / velocity;
        let normal_direction = if leave_time < enter_time {
            std::mem::swap(&mut enter_time, &mut leave_time);
            1.0
        } else {
            -1.0
        };

        let enters_this_frame = enter_time >= 0.0 && enter_time <= frame_time;
        let already_inside = enter_time < 0.0 && leave_time > 0.0;
        (enters_this_frame || already_inside).then_some(AxisEntry {
            enter_time,
            normal_direction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box(centre: Vec3) -> BoundingBox {
        BoundingBox::from_size(centre, &Size::new(2.0, 2.0, 2.0))
    }

    #[test]
    fn test_separation_and_overlap() {
        let a = unit_box(Vec3::zeros());
        let b = unit_box(Vec3::new(3.0, 0.0, 0.0));
        let c = unit_box(Vec3::new(1.5, 1.0, -1.0));

        assert_relative_eq!(a.separation_x(&b), 1.0);
        assert!(!a.overlap(&b));
        assert!(a.overlap(&c));
        assert!(a.overlap(&unit_box(Vec3::new(2.0, 0.0, 0.0))));
    }

    #[test]
    fn test_axis_check_cases() {
        // Static inside and outside
        assert!(BoundingBox::moving_check_in_axis(-1.0, 1.0, 0.0, 0.5, 0.1).is_some());
        assert!(BoundingBox::moving_check_in_axis(-1.0, 1.0, 0.0, 2.0, 0.1).is_none());

        // Moving +x, enters within the frame through the -x face
        let entry = BoundingBox::moving_check_in_axis(-1.0, 1.0, 10.0, -1.5, 0.1).unwrap();
        assert_relative_eq!(entry.enter_time, 0.05);
        assert_relative_eq!(entry.normal_direction, -1.0);

        // Moving -x, enters through the +x face
        let entry = BoundingBox::moving_check_in_axis(-1.0, 1.0, -10.0, 1.5, 0.1).unwrap();
        assert_relative_eq!(entry.enter_time, 0.05);
        assert_relative_eq!(entry.normal_direction, 1.0);

        // Too slow to arrive this frame
        assert!(BoundingBox::moving_check_in_axis(-1.0, 1.0, 1.0, -1.5, 0.1).is_none());

        // Already inside while moving
        let entry = BoundingBox::moving_check_in_axis(-1.0, 1.0, 1.0, 0.0, 0.1).unwrap();
        assert!(entry.enter_time < 0.0);

        // Already past
        assert!(BoundingBox::moving_check_in_axis(-1.0, 1.0, 1.0, 2.0, 0.1).is_none());
    }

    #[test]
    fn test_moving_to_stationary_picks_entry_face() {
        let stationary = unit_box(Vec3::zeros());
        let moving = unit_box(Vec3::new(-2.5, 0.0, 0.0));

        let hit = BoundingBox::moving_to_stationary(&stationary, &moving, &Vec3::new(10.0, 0.0, 0.0), 0.1).unwrap();
        assert_relative_eq!(hit.enter_time, 0.05);
        assert_relative_eq!(hit.normal, Vec3::new(-1.0, 0.0, 0.0));

        let above = unit_box(Vec3::new(0.0, 2.5, 0.0));
        let hit = BoundingBox::moving_to_stationary(&stationary, &above, &Vec3::new(0.0, -10.0, 0.0), 0.1).unwrap();
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 1.0, 0.0));

        let beside = unit_box(Vec3::new(-2.5, 0.0, 5.0));
        assert!(BoundingBox::moving_to_stationary(&stationary, &beside, &Vec3::new(10.0, 0.0, 0.0), 0.1).is_none());
    }
}
