use super::{Point3d, Rotation3d, Vector3d};
use cgmath::prelude::*;
use cgmath::Rad;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A position and orientation in world space.
///
/// The local frame is y-up with +z as the forward axis and +x to the right.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    pub position: Point3d,
    pub rotation: Rotation3d,
}

impl Pose {
    /// Creates a pose.
    pub fn new(position: Point3d, rotation: Rotation3d) -> Self {
        Self { position, rotation }
    }

    /// Creates an upright pose facing `yaw` radians clockwise from +z.
    pub fn from_yaw(position: Point3d, yaw: f64) -> Self {
        Self {
            position,
            rotation: Rotation3d::from_angle_y(Rad(yaw)),
        }
    }

    /// The unit vector the pose faces.
    pub fn forward(&self) -> Vector3d {
        self.rotation * Vector3d::unit_z()
    }

    /// The unit vector to the right of the pose.
    pub fn right(&self) -> Vector3d {
        self.rotation * Vector3d::unit_x()
    }

    /// The unit vector above the pose.
    pub fn up(&self) -> Vector3d {
        self.rotation * Vector3d::unit_y()
    }

    /// Transforms a point from local space into world space.
    pub fn transform_point(&self, local: Vector3d) -> Point3d {
        self.position + self.rotation * local
    }

    /// Rotates a direction from local space into world space.
    pub fn transform_direction(&self, local: Vector3d) -> Vector3d {
        self.rotation * local
    }

    /// Rotates a direction from world space into local space.
    pub fn inverse_transform_direction(&self, world: Vector3d) -> Vector3d {
        self.rotation.conjugate() * world
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Point3d::origin(),
            rotation: Rotation3d::one(),
        }
    }
}
