use crate::body::RigidBody;
use crate::debug::debug_line;
use crate::math::{clamp01, sign, EaseCurve, Vector3d};
use crate::surface::Surface;
use cgmath::prelude::*;
use itertools::izip;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The shortest accepted spring travel in m.
const MIN_TRAVEL: f64 = 1e-4; // m

/// Who writes the drive command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ControlMode {
    /// Inputs come from polling the local player's input.
    Player,
    /// Inputs come from [Locomotion::set_external_inputs].
    #[default]
    External,
}

/// A normalised drive command.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriveCommand {
    /// Positive to accelerate, negative to brake or reverse, in [-1, 1].
    pub throttle: f64,
    /// Positive to turn right, in [-1, 1].
    pub steer: f64,
}

/// A source of player driving input.
pub trait InputSource {
    /// The forward/backward axis, in [-1, 1].
    fn vertical(&self) -> f64;
    /// The left/right axis, in [-1, 1].
    fn horizontal(&self) -> f64;
}

/// Fixed axis values, usable as an [InputSource].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisInput {
    pub vertical: f64,
    pub horizontal: f64,
}

/// Where a wheel's suspension is mounted on the chassis.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WheelMount {
    /// The mount point in chassis space.
    pub position: Vector3d,
    /// The suspension's up axis in chassis space. The wheel is probed along its negation.
    pub up: Vector3d,
}

/// The ground contact of a single wheel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WheelContact {
    pub grounded: bool,
    /// How compressed the spring is, from 0 (fully extended) to 1 (fully compressed).
    pub compression: f64,
}

/// The attributes of the suspension and drive model.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocomotionAttributes {
    /// The wheel mounts. The number of wheels is fixed from here on.
    pub wheels: Vec<WheelMount>,
    /// The chassis space point drive and brake forces are applied at.
    pub acceleration_point: Vector3d,
    /// Spring force at full compression, in N.
    pub spring_stiffness: f64,
    /// Damper force per m/s of spring velocity, in N.s/m.
    pub damper_stiffness: f64,
    /// The spring length at rest, in m.
    pub rest_length: f64,
    /// How far the spring compresses from rest, in m.
    pub spring_travel: f64,
    /// The wheel radius, in m.
    pub wheel_radius: f64,
    /// The drive acceleration at full throttle, in m/s^2.
    pub acceleration: f64,
    /// No drive force is applied above this forward speed, in m/s.
    pub max_speed: f64,
    /// The braking acceleration at full reverse throttle, in m/s^2.
    pub deceleration: f64,
    /// The yaw acceleration at full steer and full authority, in rad/s^2.
    pub steer_strength: f64,
    /// Steering authority as a function of `|forward speed| / max_speed`.
    pub turning_curve: EaseCurve,
    /// Sideways acceleration per m/s of sideways speed, in 1/s.
    pub lateral_drag: f64,
}

/// The suspension and drive model of a vehicle.
///
/// It only consumes drive commands: in [ControlMode::External] they are written with
/// [Locomotion::set_external_inputs], in [ControlMode::Player] they are polled with
/// [Locomotion::poll_player_input].
#[derive(Clone, Debug)]
pub struct Locomotion {
    attributes: LocomotionAttributes,
    contacts: Vec<WheelContact>,
    grounded: bool,
    mode: ControlMode,
    command: DriveCommand,
    local_velocity: Vector3d,
    velocity_ratio: f64,
}

impl DriveCommand {
    /// No throttle and no steering.
    pub const NEUTRAL: Self = Self {
        throttle: 0.0,
        steer: 0.0,
    };

    /// Creates a command, clamping both inputs to [-1, 1].
    pub fn new(throttle: f64, steer: f64) -> Self {
        Self {
            throttle: throttle.clamp(-1.0, 1.0),
            steer: steer.clamp(-1.0, 1.0),
        }
    }
}

impl InputSource for AxisInput {
    fn vertical(&self) -> f64 {
        self.vertical
    }

    fn horizontal(&self) -> f64 {
        self.horizontal
    }
}

impl WheelMount {
    /// A mount with its suspension along the chassis' up axis.
    pub fn new(position: Vector3d) -> Self {
        Self {
            position,
            up: Vector3d::unit_y(),
        }
    }
}

impl Default for LocomotionAttributes {
    fn default() -> Self {
        Self {
            wheels: [(-0.8, 1.3), (0.8, 1.3), (-0.8, -1.3), (0.8, -1.3)]
                .map(|(x, z)| WheelMount::new(Vector3d::new(x, 0.0, z)))
                .to_vec(),
            acceleration_point: Vector3d::new(0.0, -0.2, 0.0),
            spring_stiffness: 30000.0,
            damper_stiffness: 3500.0,
            rest_length: 0.35,
            spring_travel: 0.2,
            wheel_radius: 0.33,
            acceleration: 25.0,
            max_speed: 30.0,
            deceleration: 10.0,
            steer_strength: 15.0,
            turning_curve: EaseCurve::new(0.0, 0.0, 0.25, 1.0),
            lateral_drag: 1.0,
        }
    }
}

impl Locomotion {
    /// Creates a new locomotion model in external control mode.
    pub fn new(attributes: &LocomotionAttributes) -> Self {
        let mut attributes = attributes.clone();
        if attributes.spring_travel < MIN_TRAVEL {
            log::warn!("spring travel {} is too small", attributes.spring_travel);
            attributes.spring_travel = MIN_TRAVEL;
        }
        attributes.spring_stiffness = f64::max(attributes.spring_stiffness, 0.0);
        attributes.damper_stiffness = f64::max(attributes.damper_stiffness, 0.0);
        attributes.rest_length = f64::max(attributes.rest_length, 0.0);
        attributes.wheel_radius = f64::max(attributes.wheel_radius, 0.0);
        for wheel in &mut attributes.wheels {
            wheel.up = if wheel.up.magnitude2() > 1e-12 {
                wheel.up.normalize()
            } else {
                Vector3d::unit_y()
            };
        }
        Self {
            contacts: vec![WheelContact::default(); attributes.wheels.len()],
            attributes,
            grounded: false,
            mode: ControlMode::External,
            command: DriveCommand::NEUTRAL,
            local_velocity: Vector3d::zero(),
            velocity_ratio: 0.0,
        }
    }

    pub fn attributes(&self) -> &LocomotionAttributes {
        &self.attributes
    }

    pub fn control_mode(&self) -> ControlMode {
        self.mode
    }

    /// Sets who writes the drive command.
    pub fn set_control_mode(&mut self, mode: ControlMode) {
        if self.mode != mode {
            log::debug!("locomotion control mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Writes the drive command. Ignored unless in [ControlMode::External].
    pub fn set_external_inputs(&mut self, throttle: f64, steer: f64) {
        if self.mode == ControlMode::External {
            self.command = DriveCommand::new(throttle, steer);
        }
    }

    /// Reads the drive command from player input. Ignored unless in [ControlMode::Player].
    pub fn poll_player_input(&mut self, input: &dyn InputSource) {
        if self.mode == ControlMode::Player {
            self.command = DriveCommand::new(input.vertical(), input.horizontal());
        }
    }

    /// The drive command consumed by the next physics step.
    pub fn command(&self) -> DriveCommand {
        self.command
    }

    /// The current steering command, in [-1, 1].
    pub fn current_steer_command(&self) -> f64 {
        self.command.steer
    }

    /// The wheel contacts found by the last physics step.
    pub fn wheel_contacts(&self) -> &[WheelContact] {
        &self.contacts
    }

    /// Whether more than one wheel touched the ground in the last physics step.
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// The forward speed measured by the last physics step, in m/s.
    pub fn forward_speed(&self) -> f64 {
        self.local_velocity.z
    }

    /// The forward speed divided by the maximum speed, in [-1, 1].
    pub fn velocity_ratio(&self) -> f64 {
        self.velocity_ratio
    }

    /// Applies suspension, drive, steering and stabilising forces to the body.
    pub fn fixed_step<S: Surface + ?Sized>(&mut self, body: &mut RigidBody, surface: &S) {
        self.suspension(body, surface);
        self.ground_check();
        self.calculate_velocity(body);
        self.movement(body);
    }

    /// Probes each wheel and applies its spring and damper force.
    fn suspension<S: Surface + ?Sized>(&mut self, body: &mut RigidBody, surface: &S) {
        let attrs = &self.attributes;
        let max_length = attrs.rest_length + attrs.spring_travel;

        for (mount, contact) in izip!(&attrs.wheels, &mut self.contacts) {
            let origin = body.pose().transform_point(mount.position);
            let up = body.pose().transform_direction(mount.up);

            match surface.raycast(origin, -up, max_length + attrs.wheel_radius) {
                Some(hit) => {
                    let spring_length = hit.distance - attrs.wheel_radius;
                    let compression =
                        clamp01((attrs.rest_length - spring_length) / attrs.spring_travel);
                    let spring_velocity = body.point_velocity(origin).dot(up);
                    let net_force = attrs.spring_stiffness * compression
                        - attrs.damper_stiffness * spring_velocity;
                    body.add_force_at(up * net_force, origin);
                    *contact = WheelContact {
                        grounded: true,
                        compression,
                    };
                    debug_line("suspension hit", origin, hit.point);
                }
                None => {
                    *contact = WheelContact::default();
                    let end = origin - up * (max_length + attrs.wheel_radius);
                    debug_line("suspension miss", origin, end);
                }
            }
        }
    }

    fn ground_check(&mut self) {
        let grounded_wheels = self.contacts.iter().filter(|c| c.grounded).count();
        self.grounded = grounded_wheels > 1;
    }

    fn calculate_velocity(&mut self, body: &RigidBody) {
        self.local_velocity = body.local_velocity();
        let max_speed = f64::max(1.0, self.attributes.max_speed);
        self.velocity_ratio = (self.local_velocity.z / max_speed).clamp(-1.0, 1.0);
    }

    /// The signed steering authority at the current speed.
    /// Zero at rest, and negative while reversing.
    pub(crate) fn steer_authority(&self) -> f64 {
        let ratio = self.velocity_ratio;
        self.attributes.turning_curve.y(ratio.abs()) * sign(ratio)
    }

    /// Applies drive, brake, steering and lateral forces. Does nothing while airborne.
    fn movement(&self, body: &mut RigidBody) {
        if !self.grounded {
            return;
        }
        let attrs = &self.attributes;
        let forward = body.forward();
        let point = body.pose().transform_point(attrs.acceleration_point);
        let throttle = self.command.throttle;

        if throttle > 0.0 && body.forward_speed() < attrs.max_speed {
            body.add_acceleration_at(forward * (attrs.acceleration * throttle), point);
        }
        if throttle < 0.0 {
            body.add_acceleration_at(-forward * (attrs.deceleration * -throttle), point);
        }

        let yaw = attrs.steer_strength * self.command.steer * self.steer_authority();
        body.add_angular_acceleration(body.pose().up() * yaw);

        let drag = -self.local_velocity.x * attrs.lateral_drag;
        let com = body.world_centre_of_mass();
        body.add_acceleration_at(body.pose().right() * drag, com);
    }
}
