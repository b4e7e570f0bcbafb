//! Identities of the things traffic can bump into.

use crate::math::{flat_distance, Point3d};
use crate::{PropId, VehicleId};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a traffic participant is capable of, resolved when it is added to the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Capability {
    /// A vehicle with a controllable chassis.
    Vehicle,
    /// A vehicle driven by an AI driver.
    AiDriver,
    /// Anything else: pedestrians, pickups, doors.
    Incidental,
}

impl Capability {
    /// Whether cars should queue behind or yield to this participant.
    pub fn is_traffic(self) -> bool {
        matches!(self, Capability::Vehicle | Capability::AiDriver)
    }
}

/// The identity of an agent in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentId {
    Vehicle(VehicleId),
    Prop(PropId),
}

/// A snapshot of an agent taken at the start of a frame.
#[derive(Clone, Copy, Debug)]
pub struct Agent {
    pub id: AgentId,
    /// The vehicle this agent belongs to, which is itself for a vehicle.
    pub root: Option<VehicleId>,
    /// The agent's position in world space.
    pub position: Point3d,
    /// The agent's bounding radius in m.
    pub radius: f64,
    pub capability: Capability,
}

impl Agent {
    /// Whether this agent is the given vehicle or attached to it.
    pub fn belongs_to(&self, vehicle: VehicleId) -> bool {
        self.root == Some(vehicle)
    }
}

/// Answers area-overlap queries against traffic participants.
pub trait Occupancy {
    /// Whether any traffic participant, other than those belonging to `exclude`,
    /// lies within `radius` of `centre` in the ground plane.
    fn is_occupied(&self, centre: Point3d, radius: f64, exclude: Option<VehicleId>) -> bool;
}

impl Occupancy for [Agent] {
    fn is_occupied(&self, centre: Point3d, radius: f64, exclude: Option<VehicleId>) -> bool {
        self.iter()
            .filter(|agent| agent.capability.is_traffic())
            .filter(|agent| exclude.map_or(true, |id| !agent.belongs_to(id)))
            .any(|agent| flat_distance(agent.position, centre) <= radius)
    }
}

/// Finds an agent in a snapshot.
pub(crate) fn find_agent(agents: &[Agent], id: AgentId) -> Option<&Agent> {
    agents.iter().find(|agent| agent.id == id)
}

#[cfg(test)]
mod test {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn occupancy_skips_excluded_and_incidental() {
        let mut vehicles = SlotMap::<VehicleId, ()>::with_key();
        let mut props = SlotMap::<PropId, ()>::with_key();
        let car = vehicles.insert(());
        let walker = props.insert(());
        let agents = [
            Agent {
                id: AgentId::Vehicle(car),
                root: Some(car),
                position: Point3d::new(0.0, 0.7, 0.0),
                radius: 2.0,
                capability: Capability::AiDriver,
            },
            Agent {
                id: AgentId::Prop(walker),
                root: None,
                position: Point3d::new(10.0, 0.0, 0.0),
                radius: 0.5,
                capability: Capability::Incidental,
            },
        ];
        let centre = Point3d::new(1.0, 0.0, 0.0);
        assert!(agents[..].is_occupied(centre, 2.0, None));
        assert!(!agents[..].is_occupied(centre, 2.0, Some(car)));
        assert!(!agents[..].is_occupied(Point3d::new(10.0, 0.0, 0.0), 2.0, None));
    }
}
