pub use agent::{Agent, AgentId, Capability, Occupancy};
pub use body::RigidBody;
pub use cgmath;
pub use junction::{Approach, JunctionAttributes, JunctionController, LightState, StopQuery};
pub use registry::JunctionRegistry;
pub use simulation::{Prop, Simulation};
pub use slotmap::Key;
pub use surface::{FlatGround, NoGround, RayHit, Surface};
pub use util::Interval;
pub use vehicle::{
    AiDriver, AxisInput, ControlMode, DriveCommand, DriveState, DriverAttributes, DriverState,
    DriverStateAttributes, InputSource, Locomotion, LocomotionAttributes, ProximitySensor,
    SensorAttributes, Vehicle, VehicleAttributes, WaypointRoute, WheelContact, WheelMount,
};

mod agent;
mod body;
mod debug;
mod junction;
pub mod math;
mod registry;
mod simulation;
mod surface;
mod util;
mod vehicle;

slotmap::new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of a [JunctionController].
    pub struct JunctionId;
    /// Unique ID of a [Prop].
    pub struct PropId;
}
