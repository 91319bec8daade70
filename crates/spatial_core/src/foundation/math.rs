//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the handful of guarded helpers the
//! collision, trigger and AI code rely on. Degenerate inputs (zero-length
//! vectors, singular matrices) are answered with zero or identity instead of
//! propagating NaN.

pub use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math constants
pub mod constants {
    /// Machine epsilon used by the separating-axis tests
    pub const EPSILON: f32 = f32::EPSILON;

    /// Relative tolerance for "effectively equal" float comparisons
    pub const RELATIVE_TOLERANCE: f32 = 1.0e-5;

    /// World up axis
    pub const UP: [f32; 3] = [0.0, 1.0, 0.0];

    /// World forward axis
    pub const FORWARD: [f32; 3] = [0.0, 0.0, 1.0];

    /// World right axis
    pub const RIGHT: [f32; 3] = [1.0, 0.0, 0.0];
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Vec3};
    use approx::relative_eq;

    /// True when `a` and `b` are equal within a relative tolerance.
    ///
    /// Values near zero are compared with an absolute epsilon so that
    /// `are_relatively_equal(1e-9, 0.0)` holds.
    pub fn are_relatively_equal(a: f32, b: f32) -> bool {
        relative_eq!(
            a,
            b,
            epsilon = constants::RELATIVE_TOLERANCE,
            max_relative = constants::RELATIVE_TOLERANCE
        )
    }

    /// True when `a` and `b` differ by less than `range` on the x and z axes.
    ///
    /// Height is ignored; AI steering happens on the ground plane.
    pub fn are_within_range_xz(a: &Vec3, b: &Vec3, range: f32) -> bool {
        (a.x - b.x).abs() < range && (a.z - b.z).abs() < range
    }

    /// Normalize `v`, or return zero for a zero-length vector
    pub fn normalize_or_zero(v: &Vec3) -> Vec3 {
        v.try_normalize(f32::MIN_POSITIVE).unwrap_or_else(Vec3::zeros)
    }

    /// Invert `m`, or return identity when the determinant is zero
    pub fn try_inverse_or_identity(m: &Mat4) -> Mat4 {
        m.try_inverse().unwrap_or_else(Mat4::identity)
    }

    /// Transform a point by a 4x4 affine matrix
    pub fn transform_point(m: &Mat4, p: &Vec3) -> Vec3 {
        m.transform_point(&super::Point3::from(*p)).coords
    }

    /// Clamp a value between min and max
    pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
        if value < min { min } else if value > max { max } else { value }
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// World up as a vector
    pub fn up() -> Vec3 {
        Vec3::from(constants::UP)
    }

    /// World forward as a vector
    pub fn forward() -> Vec3 {
        Vec3::from(constants::FORWARD)
    }

    /// World right as a vector
    pub fn right() -> Vec3 {
        Vec3::from(constants::RIGHT)
    }
}
