use crate::agent::{find_agent, Agent, AgentId};
use crate::math::{Point3d, Pose};
use crate::VehicleId;
use cgmath::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The attributes of a proximity sensor.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorAttributes {
    /// How far ahead of the chassis origin the sensor sits, in m.
    pub offset: f64,
    /// The radius of the sensor volume, in m.
    pub radius: f64,
}

/// A spherical trigger volume in front of a vehicle which tracks the traffic it overlaps.
#[derive(Clone, Debug)]
pub struct ProximitySensor {
    offset: f64,
    radius: f64,
    tracked: SmallVec<[AgentId; 8]>,
}

impl Default for SensorAttributes {
    fn default() -> Self {
        Self {
            offset: 3.0,
            radius: 2.5,
        }
    }
}

impl ProximitySensor {
    pub fn new(attributes: &SensorAttributes) -> Self {
        Self {
            offset: attributes.offset,
            radius: f64::max(attributes.radius, 0.0),
            tracked: SmallVec::new(),
        }
    }

    /// The centre of the sensor volume for a vehicle at `pose`.
    pub fn centre(&self, pose: &Pose) -> Point3d {
        pose.position + pose.forward() * self.offset
    }

    /// The agents currently tracked.
    pub fn tracked(&self) -> &[AgentId] {
        &self.tracked
    }

    /// Starts tracking an agent, unless it is not traffic or belongs to `owner`.
    pub fn notify_enter(&mut self, agent: &Agent, owner: VehicleId) {
        if !agent.capability.is_traffic() || agent.belongs_to(owner) {
            return;
        }
        if !self.tracked.contains(&agent.id) {
            log::trace!("{owner:?} sensor entered by {:?}", agent.id);
            self.tracked.push(agent.id);
        }
    }

    /// Stops tracking an agent.
    pub fn notify_exit(&mut self, id: AgentId) {
        self.tracked.retain(|tracked| *tracked != id);
    }

    /// Updates the tracked set from the agents overlapping the volume.
    pub fn refresh(&mut self, pose: &Pose, owner: VehicleId, agents: &[Agent]) {
        let centre = self.centre(pose);
        let radius = self.radius;
        let overlaps = |agent: &Agent| centre.distance(agent.position) <= radius + agent.radius;

        let exited = self
            .tracked
            .iter()
            .copied()
            .filter(|id| !find_agent(agents, *id).map_or(false, |agent| overlaps(agent)))
            .collect::<SmallVec<[AgentId; 8]>>();
        for id in exited {
            log::trace!("{owner:?} sensor exited by {id:?}");
            self.notify_exit(id);
        }

        for agent in agents.iter().filter(|agent| overlaps(*agent)) {
            self.notify_enter(agent, owner);
        }
    }

    /// Whether any tracked agent lies in front of a vehicle at `pose`.
    /// Agents missing from `agents` have been destroyed and are forgotten.
    pub fn has_agent_ahead(&mut self, pose: &Pose, agents: &[Agent]) -> bool {
        self.tracked.retain(|id| find_agent(agents, *id).is_some());
        let forward = pose.forward();
        self.tracked
            .iter()
            .filter_map(|id| find_agent(agents, *id))
            .any(|agent| forward.dot(agent.position - pose.position) > 0.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Capability, PropId};
    use slotmap::SlotMap;

    struct World {
        vehicles: Vec<VehicleId>,
        props: Vec<PropId>,
    }

    fn world() -> World {
        let mut vehicles = SlotMap::<VehicleId, ()>::with_key();
        let mut props = SlotMap::<PropId, ()>::with_key();
        World {
            vehicles: (0..3).map(|_| vehicles.insert(())).collect(),
            props: (0..2).map(|_| props.insert(())).collect(),
        }
    }

    fn car(id: VehicleId, z: f64) -> Agent {
        Agent {
            id: AgentId::Vehicle(id),
            root: Some(id),
            position: Point3d::new(0.0, 0.0, z),
            radius: 2.0,
            capability: Capability::AiDriver,
        }
    }

    #[test]
    fn tracks_car_ahead_only() {
        let w = world();
        let me = w.vehicles[0];
        let pose = Pose::default();
        let mut sensor = ProximitySensor::new(&Default::default());

        let agents = [car(me, 0.0), car(w.vehicles[1], 6.0)];
        sensor.refresh(&pose, me, &agents);
        assert_eq!(sensor.tracked(), &[AgentId::Vehicle(w.vehicles[1])]);
        assert!(sensor.has_agent_ahead(&pose, &agents));

        // The other car has driven away
        let agents = [car(me, 0.0), car(w.vehicles[1], 30.0)];
        sensor.refresh(&pose, me, &agents);
        assert!(sensor.tracked().is_empty());
        assert!(!sensor.has_agent_ahead(&pose, &agents));
    }

    #[test]
    fn ignores_own_children_and_incidentals() {
        let w = world();
        let me = w.vehicles[0];
        let pose = Pose::default();
        let mut sensor = ProximitySensor::new(&Default::default());
        let agents = [
            Agent {
                id: AgentId::Prop(w.props[0]),
                root: Some(me),
                position: Point3d::new(0.0, 0.0, 3.0),
                radius: 0.5,
                capability: Capability::Vehicle,
            },
            Agent {
                id: AgentId::Prop(w.props[1]),
                root: None,
                position: Point3d::new(0.0, 0.0, 3.0),
                radius: 0.5,
                capability: Capability::Incidental,
            },
        ];
        sensor.refresh(&pose, me, &agents);
        assert!(sensor.tracked().is_empty());
        assert!(!sensor.has_agent_ahead(&pose, &agents));
    }

    #[test]
    fn ignores_tracked_agent_behind() {
        let w = world();
        let me = w.vehicles[0];
        let mut sensor = ProximitySensor::new(&Default::default());
        let behind = car(w.vehicles[1], -1.0);
        sensor.notify_enter(&behind, me);
        assert!(!sensor.has_agent_ahead(&Pose::default(), &[behind]));
        assert_eq!(sensor.tracked().len(), 1);
    }

    #[test]
    fn prunes_destroyed_agents() {
        let w = world();
        let me = w.vehicles[0];
        let mut sensor = ProximitySensor::new(&Default::default());
        sensor.notify_enter(&car(w.vehicles[1], 4.0), me);
        sensor.notify_enter(&car(w.vehicles[2], 4.0), me);
        assert!(sensor.has_agent_ahead(&Pose::default(), &[car(w.vehicles[2], 4.0)]));
        assert_eq!(sensor.tracked(), &[AgentId::Vehicle(w.vehicles[2])]);
        assert!(!sensor.has_agent_ahead(&Pose::default(), &[]));
        assert!(sensor.tracked().is_empty());
    }
}
