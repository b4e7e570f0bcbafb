use crate::math::{Point3d, Pose, Rotation3d, Vector3d};
use cgmath::prelude::*;

/// Gravitational acceleration in m/s^2.
const GRAVITY: f64 = -9.81;

/// The smallest mass or moment of inertia accepted, to avoid dividing by zero.
const MIN_MASS: f64 = 1e-6;

/// A rigid chassis body with accumulated forces.
///
/// Forces and torques are accumulated by [RigidBody::add_force_at] and friends,
/// then consumed by [RigidBody::integrate] using semi-implicit Euler integration.
/// Rotational inertia is approximated by a single scalar moment.
#[derive(Clone, Debug)]
pub struct RigidBody {
    pose: Pose,
    velocity: Vector3d,
    angular_velocity: Vector3d,
    /// Mass in kg.
    mass: f64,
    /// Scalar moment of inertia in kg.m^2.
    inertia: f64,
    /// The centre of mass in local space.
    com: Vector3d,
    /// Linear drag in 1/s.
    linear_damping: f64,
    /// Angular drag in 1/s.
    angular_damping: f64,
    use_gravity: bool,
    force: Vector3d,
    torque: Vector3d,
}

impl RigidBody {
    /// Creates a body at rest. The moment of inertia is estimated from a box with the given
    /// half extents.
    pub fn new(pose: Pose, mass: f64, half_extents: Vector3d) -> Self {
        let mass = f64::max(mass, MIN_MASS);
        let (x, y, z) = (2.0 * half_extents.x, 2.0 * half_extents.y, 2.0 * half_extents.z);
        let inertia = mass * (x * x + y * y + z * z) / 12.0;
        Self {
            pose,
            velocity: Vector3d::zero(),
            angular_velocity: Vector3d::zero(),
            mass,
            inertia: f64::max(inertia, MIN_MASS),
            com: Vector3d::zero(),
            linear_damping: 0.0,
            angular_damping: 0.05,
            use_gravity: true,
            force: Vector3d::zero(),
            torque: Vector3d::zero(),
        }
    }

    /// Sets the centre of mass, in local space.
    pub fn with_centre_of_mass(mut self, com: Vector3d) -> Self {
        self.com = com;
        self
    }

    /// Sets the linear and angular drag coefficients, in 1/s.
    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = f64::max(linear, 0.0);
        self.angular_damping = f64::max(angular, 0.0);
        self
    }

    /// Enables or disables gravity.
    pub fn set_use_gravity(&mut self, use_gravity: bool) {
        self.use_gravity = use_gravity;
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn position(&self) -> Point3d {
        self.pose.position
    }

    pub fn rotation(&self) -> Rotation3d {
        self.pose.rotation
    }

    /// Teleports the body.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// The linear velocity in world space, in m/s.
    pub fn velocity(&self) -> Vector3d {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vector3d) {
        self.velocity = velocity;
    }

    /// The angular velocity in world space, in rad/s.
    pub fn angular_velocity(&self) -> Vector3d {
        self.angular_velocity
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: Vector3d) {
        self.angular_velocity = angular_velocity;
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// The unit vector the chassis faces.
    pub fn forward(&self) -> Vector3d {
        self.pose.forward()
    }

    /// The speed along the chassis' forward axis, negative when reversing.
    pub fn forward_speed(&self) -> f64 {
        self.velocity.dot(self.forward())
    }

    /// The velocity in the chassis' local frame.
    pub fn local_velocity(&self) -> Vector3d {
        self.pose.inverse_transform_direction(self.velocity)
    }

    /// The world space centre of mass.
    pub fn world_centre_of_mass(&self) -> Point3d {
        self.pose.transform_point(self.com)
    }

    /// The velocity of a world space point rigidly attached to the body.
    pub fn point_velocity(&self, point: Point3d) -> Vector3d {
        self.velocity + self.angular_velocity.cross(point - self.world_centre_of_mass())
    }

    /// Applies a force in N at a world space point.
    pub fn add_force_at(&mut self, force: Vector3d, point: Point3d) {
        self.force += force;
        self.torque += (point - self.world_centre_of_mass()).cross(force);
    }

    /// Applies a mass-independent acceleration in m/s^2 at a world space point.
    pub fn add_acceleration_at(&mut self, acc: Vector3d, point: Point3d) {
        self.add_force_at(acc * self.mass, point);
    }

    /// Applies an angular acceleration in rad/s^2, independent of inertia.
    pub fn add_angular_acceleration(&mut self, acc: Vector3d) {
        self.torque += acc * self.inertia;
    }

    /// The force accumulated since the last integration.
    pub fn accumulated_force(&self) -> Vector3d {
        self.force
    }

    /// The torque accumulated since the last integration.
    pub fn accumulated_torque(&self) -> Vector3d {
        self.torque
    }

    /// Integrates the accumulated forces over `dt` seconds, then clears them.
    pub fn integrate(&mut self, dt: f64) {
        let mut acc = self.force / self.mass;
        if self.use_gravity {
            acc.y += GRAVITY;
        }
        self.velocity += acc * dt;
        self.velocity *= 1.0 / (1.0 + self.linear_damping * dt);
        self.angular_velocity += self.torque / self.inertia * dt;
        self.angular_velocity *= 1.0 / (1.0 + self.angular_damping * dt);

        // Move the centre of mass, then rotate the body about it.
        let com = self.world_centre_of_mass() + self.velocity * dt;
        let spin = Rotation3d::from_sv(0.0, self.angular_velocity);
        let rotation = self.pose.rotation + spin * self.pose.rotation * (0.5 * dt);
        self.pose.rotation = rotation.normalize();
        self.pose.position = com - self.pose.rotation * self.com;

        self.force = Vector3d::zero();
        self.torque = Vector3d::zero();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn body() -> RigidBody {
        RigidBody::new(Pose::default(), 1000.0, Vector3d::new(1.0, 0.5, 2.0))
    }

    #[test]
    fn free_fall() {
        let mut body = body();
        for _ in 0..100 {
            body.integrate(0.01);
        }
        assert_approx_eq!(body.velocity().y, -9.81, 1e-9);
        assert!(body.position().y < -4.0);
    }

    #[test]
    fn off_centre_force_spins() {
        let mut body = body();
        body.set_use_gravity(false);
        body.add_force_at(Vector3d::new(0.0, 0.0, 100.0), Point3d::new(1.0, 0.0, 0.0));
        // Pushing the right side forward turns the body left
        assert_approx_eq!(body.accumulated_torque().y, -100.0);
        body.integrate(0.1);
        assert!(body.angular_velocity().y < 0.0);
        assert!(body.velocity().z > 0.0);
        assert_eq!(body.accumulated_force(), Vector3d::zero());
    }

    #[test]
    fn drag_slows_body() {
        let mut body = body().with_damping(1.0, 2.0);
        body.set_use_gravity(false);
        body.set_velocity(Vector3d::new(10.0, 0.0, 0.0));
        body.set_angular_velocity(Vector3d::new(0.0, 1.0, 0.0));
        body.integrate(0.5);
        assert_approx_eq!(body.velocity().x, 10.0 / 1.5);
        assert_approx_eq!(body.angular_velocity().y, 0.5);
    }

    #[test]
    fn acceleration_is_mass_independent() {
        let mut body = body();
        body.set_use_gravity(false);
        let com = body.world_centre_of_mass();
        body.add_acceleration_at(Vector3d::new(2.0, 0.0, 0.0), com);
        body.integrate(1.0);
        assert_approx_eq!(body.velocity().x, 2.0);
    }
}
