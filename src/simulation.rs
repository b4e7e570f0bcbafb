use crate::agent::{Agent, AgentId, Capability};
#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::junction::{JunctionAttributes, JunctionController, StopQuery};
use crate::math::{Point3d, Pose};
use crate::registry::JunctionRegistry;
use crate::surface::Surface;
use crate::vehicle::{DriverAttributes, InputSource, Vehicle, VehicleAttributes};
use crate::{JunctionId, PropId, VehicleId};
use rand_distr::Distribution;
use slotmap::SlotMap;

/// The longest physics step taken by [Simulation::step], in s.
const MAX_PHYSICS_DT: f64 = 0.02; // s

/// Something in the world which isn't a simulated vehicle: a pedestrian, a pickup,
/// or a collider attached to a vehicle.
#[derive(Clone, Copy, Debug)]
pub struct Prop {
    /// The prop's position in world space.
    pub position: Point3d,
    /// The prop's bounding radius in m.
    pub radius: f64,
    /// Whether traffic should treat the prop as a vehicle.
    pub capability: Capability,
    /// The vehicle the prop is attached to.
    pub parent: Option<VehicleId>,
}

/// A driving simulation.
#[derive(Default)]
pub struct Simulation {
    /// The junctions.
    junctions: JunctionRegistry,
    /// The vehicles being simulated.
    vehicles: SlotMap<VehicleId, Vehicle>,
    /// Everything else traffic may bump into.
    props: SlotMap<PropId, Prop>,
    /// The agents as they were at the start of the current frame.
    agents: Vec<Agent>,
    /// The current frame of simulation.
    frame: usize,
    /// The simulated time in s.
    time: f64,
    /// Debugging information from the previously simulated frame.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

impl Prop {
    /// A prop which traffic ignores, such as a pedestrian.
    pub fn incidental(position: Point3d, radius: f64) -> Self {
        Self {
            position,
            radius,
            capability: Capability::Incidental,
            parent: None,
        }
    }
}

impl Simulation {
    /// Creates a new simulation.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a junction, which starts out active.
    pub fn add_junction(&mut self, attributes: &JunctionAttributes) -> JunctionId {
        self.junctions.insert(attributes)
    }

    /// Removes a junction from the simulation.
    pub fn remove_junction(&mut self, id: JunctionId) {
        if self.junctions.remove(id).is_none() {
            log::warn!("cannot remove unknown junction {id:?}");
        }
    }

    /// Activates or deactivates a junction. Inactive junctions neither cycle nor stop traffic.
    pub fn set_junction_active(&mut self, id: JunctionId, active: bool) {
        self.junctions.set_active(id, active);
    }

    /// Gets a reference to the junction with the given ID.
    pub fn get_junction(&self, id: JunctionId) -> Option<&JunctionController> {
        self.junctions.get(id)
    }

    /// Returns an iterator over the active junctions.
    pub fn iter_junctions(&self) -> impl Iterator<Item = (JunctionId, &JunctionController)> {
        self.junctions.iter_active()
    }

    pub fn junctions(&self) -> &JunctionRegistry {
        &self.junctions
    }

    /// Adds a vehicle to the simulation.
    pub fn add_vehicle(&mut self, attributes: &VehicleAttributes, pose: Pose) -> VehicleId {
        self.vehicles
            .insert_with_key(|id| Vehicle::new(id, attributes, pose))
    }

    /// Removes a vehicle, along with the props attached to it.
    pub fn remove_vehicle(&mut self, id: VehicleId) {
        if self.vehicles.remove(id).is_none() {
            log::warn!("cannot remove unknown vehicle {id:?}");
            return;
        }
        self.props.retain(|_, prop| prop.parent != Some(id));
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    /// Gets a mutable reference to the vehicle with the given ID.
    pub fn get_vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(id)
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Adds a prop to the world.
    pub fn add_prop(&mut self, prop: Prop) -> PropId {
        self.props.insert(prop)
    }

    /// Removes a prop from the world.
    pub fn remove_prop(&mut self, id: PropId) {
        if self.props.remove(id).is_none() {
            log::warn!("cannot remove unknown prop {id:?}");
        }
    }

    /// Moves a prop.
    pub fn set_prop_position(&mut self, id: PropId, position: Point3d) {
        match self.props.get_mut(id) {
            Some(prop) => prop.position = position,
            None => log::warn!("cannot move unknown prop {id:?}"),
        }
    }

    pub fn get_prop(&self, id: PropId) -> Option<&Prop> {
        self.props.get(id)
    }

    /// Kills the AI driver of a vehicle. [Read more](Vehicle::kill_driver).
    pub fn kill_driver(&mut self, id: VehicleId) -> bool {
        self.with_vehicle(id, "kill driver of", Vehicle::kill_driver)
    }

    /// Damages the AI driver of a vehicle. [Read more](Vehicle::damage_driver).
    pub fn damage_driver(&mut self, id: VehicleId, amount: f64) -> bool {
        self.with_vehicle(id, "damage driver of", |v| v.damage_driver(amount))
    }

    /// Puts the player in control of a vehicle. [Read more](Vehicle::enter_as_player).
    pub fn enter_as_player(&mut self, id: VehicleId) -> bool {
        self.with_vehicle(id, "enter", Vehicle::enter_as_player)
    }

    /// Takes the player out of a vehicle. [Read more](Vehicle::exit_as_player).
    pub fn exit_as_player(&mut self, id: VehicleId) -> bool {
        self.with_vehicle(id, "exit", Vehicle::exit_as_player)
    }

    /// Hands a vehicle back to its AI driver. [Read more](Vehicle::re_enable_ai).
    pub fn re_enable_ai(&mut self, id: VehicleId) -> bool {
        self.with_vehicle(id, "re-enable AI of", Vehicle::re_enable_ai)
    }

    /// Enables or disables the AI driver of a vehicle. [Read more](Vehicle::set_ai_enabled).
    pub fn set_ai_enabled(&mut self, id: VehicleId, enabled: bool) -> bool {
        self.with_vehicle(id, "toggle AI of", |v| v.set_ai_enabled(enabled))
    }

    fn with_vehicle(
        &mut self,
        id: VehicleId,
        action: &str,
        f: impl FnOnce(&mut Vehicle) -> bool,
    ) -> bool {
        match self.vehicles.get_mut(id) {
            Some(vehicle) => f(vehicle),
            None => {
                log::warn!("cannot {action} unknown vehicle {id:?}");
                false
            }
        }
    }

    /// Determines whether a vehicle must stop for a junction, given where everything is now.
    pub fn should_stop_for_car(&self, junction: JunctionId, vehicle: VehicleId) -> bool {
        let (Some(junction), Some(vehicle)) = (self.junctions.get(junction), self.vehicles.get(vehicle))
        else {
            return false;
        };
        let brake_accel = vehicle
            .driver()
            .map_or(DriverAttributes::default().brake_accel, |d| d.brake_accel());
        let query = StopQuery {
            position: vehicle.position(),
            speed: vehicle.forward_speed().abs(),
            brake_accel,
            vehicle: Some(vehicle.id()),
        };
        let agents = self.collect_agents();
        junction.should_stop_for_car(&query, &agents[..])
    }

    /// Randomly assigns a cruise speed factor to each AI driver,
    /// which is sampled from a normal distribution with a mean of 1 (no adjustment)
    /// and standard deviation of `stddev`.
    pub fn randomise_cruise_speeds(&mut self, stddev: f64) {
        let distr = match rand_distr::Normal::new(1.0, stddev) {
            Ok(distr) => distr,
            Err(err) => {
                log::warn!("cannot randomise cruise speeds: {err}");
                return;
            }
        };
        let mut rand = rand::thread_rng();
        for driver in self.vehicles.values_mut().filter_map(Vehicle::driver_mut) {
            let factor = distr.sample(&mut rand).clamp(0.75, 1.25);
            driver.set_speed_factor(factor);
        }
    }

    /// Advances junction cycles and lets every vehicle's driver decide on its inputs.
    /// The decisions are carried out by the following [Simulation::fixed_step] calls.
    pub fn frame(&mut self, dt: f64, input: &dyn InputSource) {
        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }

        self.agents = self.collect_agents();
        self.junctions.step(dt, &self.agents[..]);
        for vehicle in self.vehicles.values_mut() {
            vehicle.control(dt, input, &self.junctions, &self.agents);
        }
        self.frame += 1;
        self.time += dt;
    }

    /// Advances the vehicle physics by `dt` seconds.
    pub fn fixed_step<S: Surface + ?Sized>(&mut self, dt: f64, surface: &S) {
        for vehicle in self.vehicles.values_mut() {
            vehicle.physics(dt, surface);
        }
    }

    /// Simulates a frame followed by enough physics steps to cover `dt` seconds.
    pub fn step<S: Surface + ?Sized>(&mut self, dt: f64, input: &dyn InputSource, surface: &S) {
        self.frame(dt, input);
        let steps = f64::max((dt / MAX_PHYSICS_DT).ceil(), 1.0) as usize;
        for _ in 0..steps {
            self.fixed_step(dt / steps as f64, surface);
        }
    }

    /// Gets the number of frames simulated.
    pub fn frame_count(&self) -> usize {
        self.frame
    }

    /// Gets the simulated time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Gets the debugging information for the previously simulated frame as JSON array.
    #[cfg(feature = "debug")]
    pub fn debug(&mut self) -> serde_json::Value {
        self.debug.clone()
    }

    /// Takes a snapshot of every vehicle and prop.
    fn collect_agents(&self) -> Vec<Agent> {
        let vehicles = self.vehicles.values().map(Vehicle::agent);
        let props = self.props.iter().map(|(id, prop)| Agent {
            id: AgentId::Prop(id),
            root: prop.parent,
            position: prop.position,
            radius: prop.radius,
            capability: prop.capability,
        });
        vehicles.chain(props).collect()
    }
}
