use super::{Point3d, Vector3d};
use cgmath::prelude::*;

/// Projects a vector onto the ground plane by discarding its vertical component.
pub fn flatten(v: Vector3d) -> Vector3d {
    Vector3d::new(v.x, 0.0, v.z)
}

/// The distance between two points measured in the ground plane.
pub fn flat_distance(a: Point3d, b: Point3d) -> f64 {
    flatten(b - a).magnitude()
}

/// Computes the signed angle in radians about the vertical axis from `from` to `to`,
/// both projected onto the ground plane.
/// Positive angles turn towards +x when facing +z, i.e. to the right.
///
/// Returns zero if either vector is degenerate in the ground plane.
pub fn signed_yaw(from: Vector3d, to: Vector3d) -> f64 {
    let (from, to) = (flatten(from), flatten(to));
    if from.magnitude2() < 1e-12 || to.magnitude2() < 1e-12 {
        return 0.0;
    }
    let cross = from.z * to.x - from.x * to.z;
    let dot = from.dot(to);
    f64::atan2(cross, dot)
}

/// Clamps a value to the unit interval.
pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Linearly interpolates between `a` and `b`, with `t` clamped to [0, 1].
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * clamp01(t)
}

/// The sign of `x`, treating zero as positive.
pub fn sign(x: f64) -> f64 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}
