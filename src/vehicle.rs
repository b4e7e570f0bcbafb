use crate::agent::{Agent, AgentId, Capability};
use crate::body::RigidBody;
use crate::math::{Point3d, Pose, Vector3d};
use crate::registry::JunctionRegistry;
use crate::surface::Surface;
use crate::VehicleId;
use cgmath::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use driver::{AiDriver, DriverAttributes};
pub use locomotion::{
    AxisInput, ControlMode, DriveCommand, InputSource, Locomotion, LocomotionAttributes,
    WheelContact, WheelMount,
};
pub use route::WaypointRoute;
pub use sensor::{ProximitySensor, SensorAttributes};
pub use state::{DriveState, DriverState, DriverStateAttributes};

mod driver;
mod locomotion;
mod route;
mod sensor;
mod state;

/// A simulated car: a rigid chassis on suspension, optionally driven by an AI.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID
    pub(crate) id: VehicleId,
    /// The chassis.
    body: RigidBody,
    /// The suspension and drive model.
    locomotion: Locomotion,
    /// The volume used to spot cars ahead.
    sensor: Option<ProximitySensor>,
    /// The AI driver, if there is one.
    driver: Option<AiDriver>,
    /// Decides who drives.
    state: DriverState,
    /// The bounding radius used by other vehicles' sensors, in m.
    radius: f64,
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleAttributes {
    /// The chassis mass in kg.
    pub mass: f64,
    /// Half the chassis' width, height and length in m.
    pub half_extents: Vector3d,
    /// The centre of mass in chassis space.
    pub centre_of_mass: Vector3d,
    /// Linear drag on the chassis in 1/s.
    pub drag: f64,
    /// Angular drag on the chassis in 1/s.
    pub angular_drag: f64,
    pub locomotion: LocomotionAttributes,
    pub sensor: Option<SensorAttributes>,
    /// The AI driver. A vehicle without one can only be driven by the player.
    pub driver: Option<DriverAttributes>,
    pub driver_state: DriverStateAttributes,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            mass: 1200.0,
            half_extents: Vector3d::new(0.9, 0.6, 2.2),
            centre_of_mass: Vector3d::new(0.0, -0.3, 0.0),
            drag: 0.0,
            angular_drag: 0.05,
            locomotion: Default::default(),
            sensor: Some(Default::default()),
            driver: None,
            driver_state: Default::default(),
        }
    }
}

impl Vehicle {
    /// Creates a new vehicle at rest.
    pub(crate) fn new(id: VehicleId, attributes: &VehicleAttributes, pose: Pose) -> Self {
        let body = RigidBody::new(pose, attributes.mass, attributes.half_extents)
            .with_centre_of_mass(attributes.centre_of_mass)
            .with_damping(attributes.drag, attributes.angular_drag);
        let driver = attributes.driver.as_ref().map(AiDriver::new);
        Self {
            id,
            body,
            locomotion: Locomotion::new(&attributes.locomotion),
            sensor: attributes.sensor.as_ref().map(ProximitySensor::new),
            state: DriverState::new(&attributes.driver_state, driver.is_some()),
            driver,
            radius: f64::min(attributes.half_extents.x, attributes.half_extents.z).abs(),
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn body(&self) -> &RigidBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut RigidBody {
        &mut self.body
    }

    pub fn pose(&self) -> &Pose {
        self.body.pose()
    }

    /// The position of the chassis origin.
    pub fn position(&self) -> Point3d {
        self.body.position()
    }

    /// The speed along the chassis' forward axis in m/s, negative when reversing.
    pub fn forward_speed(&self) -> f64 {
        self.body.forward_speed()
    }

    pub fn locomotion(&self) -> &Locomotion {
        &self.locomotion
    }

    pub fn locomotion_mut(&mut self) -> &mut Locomotion {
        &mut self.locomotion
    }

    pub fn sensor(&self) -> Option<&ProximitySensor> {
        self.sensor.as_ref()
    }

    pub fn driver(&self) -> Option<&AiDriver> {
        self.driver.as_ref()
    }

    pub fn driver_mut(&mut self) -> Option<&mut AiDriver> {
        self.driver.as_mut()
    }

    pub fn driver_state(&self) -> &DriverState {
        &self.state
    }

    /// Who is driving.
    pub fn drive_state(&self) -> DriveState {
        self.state.state()
    }

    /// The bounding radius in m.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// What the vehicle counts as for other traffic.
    pub fn capability(&self) -> Capability {
        if self.driver.is_some() {
            Capability::AiDriver
        } else {
            Capability::Vehicle
        }
    }

    /// Takes a snapshot of the vehicle as seen by other traffic.
    pub(crate) fn agent(&self) -> Agent {
        Agent {
            id: AgentId::Vehicle(self.id),
            root: Some(self.id),
            position: self.position(),
            radius: self.radius,
            capability: self.capability(),
        }
    }

    /// Kills the AI driver, after which the vehicle brakes to a halt.
    pub fn kill_driver(&mut self) -> bool {
        let killed = self.state.on_driver_killed();
        if killed {
            self.on_ai_lost();
        }
        killed
    }

    /// Damages the AI driver, killing them once their health runs out.
    pub fn damage_driver(&mut self, amount: f64) -> bool {
        let killed = self.state.damage(amount);
        if killed {
            self.on_ai_lost();
        }
        killed
    }

    fn on_ai_lost(&mut self) {
        if let Some(driver) = &mut self.driver {
            driver.set_enabled(false);
        }
        self.locomotion.set_control_mode(ControlMode::External);
    }

    /// Switches the AI driver on or off. Switching it off leaves the vehicle
    /// braking to a halt, after which the player may take over.
    /// Returns `false` if the vehicle has no AI driver.
    pub fn set_ai_enabled(&mut self, enabled: bool) -> bool {
        if self.driver.is_none() {
            return false;
        }
        if enabled {
            return self.re_enable_ai();
        }
        if self.state.on_ai_disabled() {
            self.on_ai_lost();
        } else if let Some(driver) = &mut self.driver {
            driver.set_enabled(false);
        }
        true
    }

    /// Lets the player take over. Returns `false` if the vehicle can't be entered now.
    pub fn enter_as_player(&mut self) -> bool {
        let speed = self.body.velocity().magnitude();
        if !self.state.enter_as_player(speed) {
            return false;
        }
        if let Some(driver) = &mut self.driver {
            driver.set_enabled(false);
        }
        self.locomotion.set_control_mode(ControlMode::External);
        self.locomotion.set_external_inputs(0.0, 0.0);
        self.locomotion.set_control_mode(ControlMode::Player);
        true
    }

    /// Lets the player get out. Returns `false` if the vehicle is moving too fast.
    pub fn exit_as_player(&mut self) -> bool {
        let speed = self.body.velocity().magnitude();
        if !self.state.exit_as_player(speed) {
            return false;
        }
        self.locomotion.set_control_mode(ControlMode::External);
        true
    }

    /// Revives the AI driver and hands control back to them.
    pub fn re_enable_ai(&mut self) -> bool {
        if !self.state.re_enable_ai() {
            return false;
        }
        if let Some(driver) = &mut self.driver {
            driver.set_enabled(true);
        }
        self.locomotion.set_control_mode(ControlMode::External);
        true
    }

    /// Decides on the drive command for the next physics steps.
    pub(crate) fn control(
        &mut self,
        dt: f64,
        input: &dyn InputSource,
        junctions: &JunctionRegistry,
        agents: &[Agent],
    ) {
        if let Some(sensor) = &mut self.sensor {
            sensor.refresh(self.body.pose(), self.id, agents);
        }
        self.locomotion.poll_player_input(input);

        if let Some(command) = self.state.tick(dt, self.body.forward_speed()) {
            self.locomotion.set_control_mode(ControlMode::External);
            self.locomotion
                .set_external_inputs(command.throttle, command.steer);
            return;
        }

        if !self.state.is_ai_driving() {
            return;
        }
        let Some(driver) = &mut self.driver else {
            return;
        };
        let sensor = self.sensor.as_mut();
        let command = driver
            .tick(self.id, &self.body, junctions, sensor, agents)
            .unwrap_or(DriveCommand::NEUTRAL);
        self.locomotion
            .set_external_inputs(command.throttle, command.steer);
    }

    /// Applies the chassis forces and integrates the body over `dt` seconds.
    pub(crate) fn physics<S: Surface + ?Sized>(&mut self, dt: f64, surface: &S) {
        self.locomotion.fixed_step(&mut self.body, surface);
        if self.state.is_ai_driving() {
            if let Some(driver) = &self.driver {
                driver.align_to_ground(&mut self.body, surface);
            }
        }
        self.body.integrate(dt);
    }
}
