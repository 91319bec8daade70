//! Primitive collision shapes and intersection algorithms
//!
//! Segments are swept from an entity's current position to its projected
//! one, so every test here works on a finite segment rather than an infinite
//! ray, and reports hit distances as a fraction of the segment in `[0, 1]`.

use crate::foundation::math::{constants, Vec3};

/// A finite line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Start point
    pub start: Vec3,
    /// End point
    pub end: Vec3,
}

impl Segment {
    /// Creates a new segment
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    /// Point at fraction `t` along the segment
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.start + (self.end - self.start) * t
    }

    /// Segment length
    pub fn length(&self) -> f32 {
        (self.end - self.start).magnitude()
    }
}

/// Result of a segment intersection test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    /// Fraction along the segment, in `[0, 1]`
    pub distance: f32,
    /// Intersection point in world space
    pub point: Vec3,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Create a cube from its maximum corner and half size
    pub fn from_max_corner(max: Vec3, half_size: f32) -> Self {
        let size = 2.0 * half_size;
        Self {
            min: max - Vec3::new(size, size, size),
            max,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Separating-axis overlap test against a segment
    ///
    /// Tests the three box face normals and the three cross products of the
    /// segment direction with the box axes. The cross-axis tests carry an
    /// epsilon so a segment parallel to a face is not rejected by rounding.
    pub fn overlaps_segment(&self, segment: &Segment) -> bool {
        let half = (segment.end - segment.start) * 0.5;
        let e = self.extents();
        let c = segment.start + half - self.center();
        let ad = half.abs();

        if c.x.abs() > e.x + ad.x || c.y.abs() > e.y + ad.y || c.z.abs() > e.z + ad.z {
            return false;
        }

        let eps = constants::EPSILON;
        let cross = Vec3::new(
            half.y * c.z - half.z * c.y,
            half.z * c.x - half.x * c.z,
            half.x * c.y - half.y * c.x,
        );
        let reach = Vec3::new(
            e.y * ad.z + e.z * ad.y,
            e.x * ad.z + e.z * ad.x,
            e.x * ad.y + e.y * ad.x,
        );

        cross.x.abs() <= reach.x + eps
            && cross.y.abs() <= reach.y + eps
            && cross.z.abs() <= reach.z + eps
    }
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Triangle vertices in world space
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Calculates the normal of the triangle (right-hand rule)
    ///
    /// Degenerate triangles give a zero normal.
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        crate::foundation::math::utils::normalize_or_zero(&edge1.cross(&edge2))
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Smallest box containing the triangle
    pub fn bounds(&self) -> AABB {
        AABB::new(
            self.v0.inf(&self.v1).inf(&self.v2),
            self.v0.sup(&self.v1).sup(&self.v2),
        )
    }

    /// Two-sided segment intersection
    ///
    /// Runs the one-sided test for both windings, so a triangle is hit from
    /// either face.
    pub fn intersect_segment(&self, segment: &Segment) -> Option<SegmentHit> {
        Self::intersect_one_sided(segment, self.v0, self.v1, self.v2)
            .or_else(|| Self::intersect_one_sided(segment, self.v0, self.v2, self.v1))
    }

    /// One-sided segment/triangle test using scalar triple products
    ///
    /// Only hits from the side the counter-clockwise winding faces are
    /// reported. Degenerate triangles and segments parallel to the plane
    /// give a zero denominator and never hit.
    fn intersect_one_sided(segment: &Segment, a: Vec3, b: Vec3, c: Vec3) -> Option<SegmentHit> {
        let ab = b - a;
        let ac = c - a;
        let qp = segment.start - segment.end;

        let n = ab.cross(&ac);
        let d = qp.dot(&n);
        if d <= 0.0 {
            return None;
        }

        let ap = segment.start - a;
        let t = ap.dot(&n);
        if t < 0.0 || t > d {
            return None;
        }

        let e = qp.cross(&ap);
        let v = ac.dot(&e);
        if v < 0.0 || v > d {
            return None;
        }
        let w = -ab.dot(&e);
        if w < 0.0 || v + w > d {
            return None;
        }

        let inv = 1.0 / d;
        let (t, v, w) = (t * inv, v * inv, w * inv);
        let u = 1.0 - v - w;

        Some(SegmentHit {
            distance: t,
            point: a * u + b * v + c * w,
        })
    }
}

/// A triangle with the hashed name of the surface it belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedTriangle {
    /// Geometry
    pub triangle: Triangle,
    /// Hashed surface tag
    pub tag: u32,
}

impl TaggedTriangle {
    /// Creates a tagged triangle
    pub fn new(triangle: Triangle, tag: u32) -> Self {
        Self { triangle, tag }
    }
}

/// Nearest hit over a set of triangles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestHit {
    /// Segment hit
    pub hit: SegmentHit,
    /// Tag of the triangle that was hit
    pub tag: u32,
}

/// Find the nearest triangle hit along `segment` that is closer than `closer_than`
pub fn nearest_hit<'a, I>(segment: &Segment, triangles: I, closer_than: f32) -> Option<NearestHit>
where
    I: IntoIterator<Item = &'a TaggedTriangle>,
{
    let mut best: Option<NearestHit> = None;
    let mut limit = closer_than;

    for tagged in triangles {
        if let Some(hit) = tagged.triangle.intersect_segment(segment) {
            if hit.distance < limit {
                limit = hit.distance;
                best = Some(NearestHit { hit, tag: tagged.tag });
            }
        }
    }

    best
}
