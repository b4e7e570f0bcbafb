//! Mathematical structs and functions.

use cgmath::{Point3, Quaternion, Vector3};
pub use ease::EaseCurve;
pub use pose::Pose;
pub use util::*;

mod ease;
mod pose;
mod util;

/// A 3D point
pub type Point3d = Point3<f64>;

/// A 3D vector
pub type Vector3d = Vector3<f64>;

/// A rotation
pub type Rotation3d = Quaternion<f64>;
