use super::route::WaypointRoute;
use super::sensor::ProximitySensor;
use super::DriveCommand;
use crate::agent::Agent;
use crate::body::RigidBody;
use crate::debug::debug_line;
use crate::junction::{stopping_distance, StopQuery};
use crate::math::{flatten, signed_yaw, Point3d, Vector3d};
use crate::registry::JunctionRegistry;
use crate::surface::Surface;
use crate::util::Interval;
use crate::VehicleId;
use cgmath::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;

/// Extra distance added to the driver's own stopping distance, in m.
const BRAKING_MARGIN: f64 = 1.0; // m

/// How far above the chassis the ground alignment probe starts, in m.
const ALIGN_RAY_HEIGHT: f64 = 2.0; // m

/// How far below the chassis the ground alignment probe reaches, in m.
const ALIGN_RAY_DOWN: f64 = 4.0; // m

/// The attributes of an AI driver.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriverAttributes {
    /// The route, driven cyclically.
    pub waypoints: Vec<Point3d>,
    /// The distance at which a waypoint counts as reached, in m.
    pub switch_radius: f64,
    /// How far ahead along the direction to the target the driver aims, in m.
    pub lookahead: f64,
    /// The speed the driver aims for when nothing is in the way, in m/s.
    pub cruise_speed: f64,
    /// Steering command per radian of heading error.
    pub steer_gain: f64,
    /// The largest steering command, from standing still to cruising.
    pub steer_limit: Interval,
    /// Throttle command per m/s of speed error.
    pub throttle_gain: f64,
    /// The most negative throttle the driver commands.
    pub reverse_floor: f64,
    /// The deceleration the driver expects to brake with, in m/s^2.
    pub brake_accel: f64,
    /// If set, the strength with which the chassis is tilted to match the ground, in 1/s^2.
    pub ground_align: Option<f64>,
}

/// Drives a vehicle around a waypoint route, yielding at junctions and to cars ahead.
#[derive(Clone, Debug)]
pub struct AiDriver {
    route: WaypointRoute,
    lookahead: f64,
    cruise_speed: f64,
    speed_factor: f64,
    steer_gain: f64,
    steer_limit: Interval,
    throttle_gain: f64,
    reverse_floor: f64,
    brake_accel: f64,
    ground_align: Option<f64>,
    enabled: bool,
    /// The point aimed at by the last tick.
    aim: Option<Point3d>,
}

impl Default for DriverAttributes {
    fn default() -> Self {
        Self {
            waypoints: vec![],
            switch_radius: 2.0,
            lookahead: 6.0,
            cruise_speed: 12.0,
            // Full lock at 45 degrees
            steer_gain: 1.0 / FRAC_PI_4,
            steer_limit: Interval::new(0.5, 1.0),
            throttle_gain: 0.15,
            reverse_floor: -0.3,
            brake_accel: 3.0,
            ground_align: None,
        }
    }
}

impl AiDriver {
    /// Creates a new, enabled driver.
    pub fn new(attributes: &DriverAttributes) -> Self {
        let reverse_floor = attributes.reverse_floor.clamp(-1.0, 0.0);
        if reverse_floor != attributes.reverse_floor {
            log::warn!("reverse floor {} clamped", attributes.reverse_floor);
        }
        Self {
            route: WaypointRoute::new(attributes.waypoints.clone(), attributes.switch_radius),
            lookahead: f64::max(attributes.lookahead, 0.0),
            cruise_speed: f64::max(attributes.cruise_speed, 0.0),
            speed_factor: 1.0,
            steer_gain: attributes.steer_gain,
            steer_limit: attributes.steer_limit,
            throttle_gain: f64::max(attributes.throttle_gain, 0.0),
            reverse_floor,
            brake_accel: attributes.brake_accel,
            ground_align: attributes.ground_align,
            enabled: true,
            aim: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the driver. A disabled driver issues no commands.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn route(&self) -> &WaypointRoute {
        &self.route
    }

    pub fn route_mut(&mut self) -> &mut WaypointRoute {
        &mut self.route
    }

    /// The speed the driver aims for, including its speed factor, in m/s.
    pub fn cruise_speed(&self) -> f64 {
        self.cruise_speed * self.speed_factor
    }

    /// Scales the cruise speed, to give drivers some individuality.
    pub fn set_speed_factor(&mut self, factor: f64) {
        self.speed_factor = f64::max(factor, 0.0);
    }

    pub fn speed_factor(&self) -> f64 {
        self.speed_factor
    }

    /// The deceleration the driver expects to brake with, in m/s^2.
    pub fn brake_accel(&self) -> f64 {
        self.brake_accel
    }

    /// The point aimed at by the last tick, if the driver has a target.
    pub fn aim(&self) -> Option<Point3d> {
        self.aim
    }

    /// Decides on the drive command for the vehicle `id`.
    ///
    /// Returns `None` if the driver is disabled. A driver with an empty route
    /// always returns the neutral command.
    pub fn tick(
        &mut self,
        id: VehicleId,
        body: &RigidBody,
        junctions: &JunctionRegistry,
        sensor: Option<&mut ProximitySensor>,
        agents: &[Agent],
    ) -> Option<DriveCommand> {
        if !self.enabled {
            return None;
        }

        let position = body.position();
        self.route.advance(position);
        let Some(target) = self.route.target() else {
            self.aim = None;
            return Some(DriveCommand::NEUTRAL);
        };

        // Aim along the direction to the target
        let to_target = flatten(target - position);
        let aim = if to_target.magnitude2() > 1e-12 {
            position + to_target.normalize() * self.lookahead
        } else {
            target
        };
        self.aim = Some(aim);
        debug_line("ai aim", position, aim);

        let forward = body.forward();
        let speed = body.forward_speed();
        let cruise_speed = self.cruise_speed();

        // Less steering at low speed, so the car doesn't weave
        let limit = self.steer_limit.lerp(speed.abs() / f64::max(cruise_speed, 1.0)).abs();
        let steer = (signed_yaw(forward, aim - position) * self.steer_gain).clamp(-limit, limit);

        let query = StopQuery {
            position,
            speed: speed.abs(),
            brake_accel: self.brake_accel,
            vehicle: Some(id),
        };
        let stop_for_junction = junctions
            .nearest_at(position)
            .map_or(false, |(_, junction)| junction.should_stop_for_car(&query, agents));
        let stop_for_car = sensor.map_or(false, |sensor| sensor.has_agent_ahead(body.pose(), agents));
        let must_stop = stop_for_junction
            || stop_for_car
            || junctions.stop_required_within(&query, forward, self.braking_distance(speed), agents);

        let desired_speed = if must_stop { 0.0 } else { cruise_speed };
        let throttle = (self.throttle_gain * (desired_speed - speed)).clamp(self.reverse_floor, 1.0);

        Some(DriveCommand::new(throttle, steer))
    }

    /// The distance the driver needs to stop from `speed`, in m.
    fn braking_distance(&self, speed: f64) -> f64 {
        stopping_distance(speed, self.brake_accel, BRAKING_MARGIN)
    }

    /// Tilts the chassis towards the ground beneath it, if ground alignment is enabled.
    pub fn align_to_ground<S: Surface + ?Sized>(&self, body: &mut RigidBody, surface: &S) {
        let Some(strength) = self.ground_align else {
            return;
        };
        if !self.enabled {
            return;
        }
        let origin = body.position() + Vector3d::unit_y() * ALIGN_RAY_HEIGHT;
        let max_distance = ALIGN_RAY_HEIGHT + ALIGN_RAY_DOWN;
        let Some(hit) = surface.raycast(origin, -Vector3d::unit_y(), max_distance) else {
            return;
        };

        let up = body.pose().up();
        let axis = up.cross(hit.normal);
        let sin = axis.magnitude();
        if sin < 1e-9 {
            return;
        }
        let angle = f64::atan2(sin, up.dot(hit.normal));
        body.add_angular_acceleration(axis / sin * (angle * strength));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::agent::{AgentId, Capability};
    use crate::junction::{Approach, JunctionAttributes};
    use crate::math::Pose;
    use crate::surface::FlatGround;
    use assert_approx_eq::assert_approx_eq;
    use cgmath::{Quaternion, Rad};
    use slotmap::SlotMap;

    fn ids() -> [VehicleId; 2] {
        let mut map = SlotMap::<VehicleId, ()>::with_key();
        [map.insert(()), map.insert(())]
    }

    fn body(z: f64, speed: f64) -> RigidBody {
        let mut body = RigidBody::new(
            Pose::from_yaw(Point3d::new(0.0, 0.0, z), 0.0),
            1200.0,
            Vector3d::new(0.9, 0.6, 2.2),
        );
        body.set_velocity(Vector3d::new(0.0, 0.0, speed));
        body
    }

    fn driver(waypoints: &[(f64, f64)]) -> AiDriver {
        AiDriver::new(&DriverAttributes {
            waypoints: waypoints
                .iter()
                .map(|&(x, z)| Point3d::new(x, 0.0, z))
                .collect(),
            ..Default::default()
        })
    }

    fn tick(driver: &mut AiDriver, body: &RigidBody, junctions: &JunctionRegistry) -> DriveCommand {
        let [me, _] = ids();
        driver
            .tick(me, body, junctions, None, &[])
            .unwrap_or_default()
    }

    #[test]
    fn empty_route_is_neutral() {
        let mut driver = driver(&[]);
        let junctions = JunctionRegistry::new();
        for _ in 0..5 {
            assert_eq!(tick(&mut driver, &body(0.0, 3.0), &junctions), DriveCommand::NEUTRAL);
        }
        assert_eq!(driver.aim(), None);
    }

    #[test]
    fn disabled_driver_issues_nothing() {
        let mut driver = driver(&[(0.0, 50.0)]);
        driver.set_enabled(false);
        let [me, _] = ids();
        let command = driver.tick(me, &body(0.0, 0.0), &JunctionRegistry::new(), None, &[]);
        assert_eq!(command, None);
        assert!(!driver.is_enabled());
    }

    #[test]
    fn accelerates_towards_cruise_speed() {
        let mut driver = driver(&[(0.0, 50.0)]);
        let junctions = JunctionRegistry::new();
        let command = tick(&mut driver, &body(0.0, 0.0), &junctions);
        assert_approx_eq!(command.throttle, 1.0);
        assert_approx_eq!(command.steer, 0.0);
        assert_approx_eq!(driver.aim().map_or(0.0, |aim| aim.z), 6.0);

        let command = tick(&mut driver, &body(0.0, 12.0), &junctions);
        assert_approx_eq!(command.throttle, 0.0);

        driver.set_speed_factor(0.5);
        let command = tick(&mut driver, &body(0.0, 8.0), &junctions);
        assert_approx_eq!(command.throttle, -0.3);
    }

    #[test]
    fn steers_right_towards_target_within_limit() {
        let mut driver = driver(&[(10.0, 10.0)]);
        let junctions = JunctionRegistry::new();
        // 45 degrees to the right, limited at rest
        let command = tick(&mut driver, &body(0.0, 0.0), &junctions);
        assert_approx_eq!(command.steer, 0.5);
        // Full lock is allowed at cruise speed
        let command = tick(&mut driver, &body(0.0, 12.0), &junctions);
        assert_approx_eq!(command.steer, 1.0);

        let mut driver = self::driver(&[(-1.0, 10.0)]);
        let command = tick(&mut driver, &body(0.0, 12.0), &junctions);
        assert!(command.steer < 0.0 && command.steer > -0.2);
    }

    #[test]
    fn stops_at_red_light() {
        let mut junctions = JunctionRegistry::new();
        junctions.insert(&JunctionAttributes {
            approaches: vec![
                Approach::light(Point3d::new(10.0, 0.0, 30.0)),
                Approach::light(Point3d::new(0.0, 0.0, 20.0)),
            ],
            ..Default::default()
        });
        let mut driver = driver(&[(0.0, 100.0)]);

        // Waiting at the red approach
        let command = tick(&mut driver, &body(18.0, 0.0), &junctions);
        assert_approx_eq!(command.throttle, 0.0);

        // Approaching fast, still outside the stop sphere
        let command = tick(&mut driver, &body(8.0, 12.0), &junctions);
        assert_approx_eq!(command.throttle, -0.3);

        // Far away
        let command = tick(&mut driver, &body(-20.0, 0.0), &junctions);
        assert_approx_eq!(command.throttle, 1.0);
    }

    #[test]
    fn stops_for_car_ahead() {
        let [me, other] = ids();
        let agents = [Agent {
            id: AgentId::Vehicle(other),
            root: Some(other),
            position: Point3d::new(0.0, 0.0, 4.0),
            radius: 2.0,
            capability: Capability::AiDriver,
        }];
        let body = body(0.0, 0.0);
        let mut sensor = ProximitySensor::new(&Default::default());
        sensor.refresh(body.pose(), me, &agents);

        let mut driver = driver(&[(0.0, 100.0)]);
        let junctions = JunctionRegistry::new();
        let command = driver.tick(me, &body, &junctions, Some(&mut sensor), &agents);
        assert_approx_eq!(command.unwrap_or_default().throttle, 0.0);

        let command = driver.tick(me, &body, &junctions, None, &agents);
        assert_approx_eq!(command.unwrap_or_default().throttle, 1.0);
    }

    #[test]
    fn tilts_towards_ground() {
        let driver = AiDriver::new(&DriverAttributes {
            ground_align: Some(8.0),
            ..Default::default()
        });
        let tilt = Quaternion::from_angle_x(Rad(0.1));
        let mut body = RigidBody::new(
            Pose::new(Point3d::new(0.0, 0.5, 0.0), tilt),
            1200.0,
            Vector3d::new(0.9, 0.6, 2.2),
        );
        driver.align_to_ground(&mut body, &FlatGround::new(0.0));
        let torque = body.accumulated_torque();
        assert!(torque.x < 0.0);
        assert_approx_eq!(torque.y, 0.0);
        assert_approx_eq!(torque.z, 0.0);

        let level = AiDriver::new(&DriverAttributes {
            ground_align: Some(8.0),
            ..Default::default()
        });
        let mut body = self::body(0.0, 0.0);
        level.align_to_ground(&mut body, &FlatGround::new(0.0));
        assert_eq!(body.accumulated_torque(), Vector3d::zero());
    }
}
