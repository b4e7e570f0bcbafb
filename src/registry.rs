use crate::agent::Occupancy;
use crate::junction::{JunctionAttributes, JunctionController, StopQuery};
use crate::math::{flat_distance, flatten, Point3d, Vector3d};
use crate::JunctionId;
use cgmath::prelude::*;
use slotmap::SlotMap;

/// The junctions known to a simulation.
///
/// Lookups are linear scans; junction counts are small and the scan only
/// touches junctions that are active.
#[derive(Clone, Debug, Default)]
pub struct JunctionRegistry {
    junctions: SlotMap<JunctionId, Entry>,
}

#[derive(Clone, Debug)]
struct Entry {
    junction: JunctionController,
    active: bool,
}

impl JunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates and registers an active junction.
    pub fn insert(&mut self, attributes: &JunctionAttributes) -> JunctionId {
        self.junctions.insert(Entry {
            junction: JunctionController::new(attributes),
            active: true,
        })
    }

    /// Removes a junction.
    pub fn remove(&mut self, id: JunctionId) -> Option<JunctionController> {
        self.junctions.remove(id).map(|entry| entry.junction)
    }

    /// Activates or deactivates a junction. Inactive junctions are not stepped or queried.
    pub fn set_active(&mut self, id: JunctionId, active: bool) {
        match self.junctions.get_mut(id) {
            Some(entry) => entry.active = active,
            None => log::warn!("cannot set activity of unknown junction {id:?}"),
        }
    }

    /// Whether a junction is registered and active.
    pub fn is_active(&self, id: JunctionId) -> bool {
        self.junctions.get(id).map_or(false, |entry| entry.active)
    }

    /// Gets a junction, whether or not it is active.
    pub fn get(&self, id: JunctionId) -> Option<&JunctionController> {
        self.junctions.get(id).map(|entry| &entry.junction)
    }

    /// Returns an iterator over the active junctions.
    pub fn iter_active(&self) -> impl Iterator<Item = (JunctionId, &JunctionController)> {
        self.junctions
            .iter()
            .filter(|(_, entry)| entry.active)
            .map(|(id, entry)| (id, &entry.junction))
    }

    /// The number of registered junctions, active or not.
    pub fn len(&self) -> usize {
        self.junctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.junctions.is_empty()
    }

    /// Advances the cycles of all active junctions.
    pub fn step<O: Occupancy + ?Sized>(&mut self, dt: f64, occupancy: &O) {
        for entry in self.junctions.values_mut().filter(|entry| entry.active) {
            entry.junction.step(dt, occupancy);
        }
    }

    /// Finds the active junction nearest to `position` among those which
    /// have `position` inside one of their stop spheres.
    pub fn nearest_at(&self, position: Point3d) -> Option<(JunctionId, &JunctionController)> {
        self.iter_active()
            .filter(|(_, junction)| junction.is_car_at_this_junction(position))
            .map(|(id, junction)| (id, junction, flat_distance(position, junction.centre())))
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(id, junction, _)| (id, junction))
    }

    /// Whether any active junction approach lies ahead of a car, within `distance`,
    /// and would require the car to stop once it got there.
    ///
    /// Only approaches between the car and their junction's centre are considered,
    /// so a car already crossing a junction ignores the approaches on its far side.
    pub fn stop_required_within<O: Occupancy + ?Sized>(
        &self,
        query: &StopQuery,
        forward: Vector3d,
        distance: f64,
        occupancy: &O,
    ) -> bool {
        let forward = flatten(forward);
        self.iter_active().any(|(_, junction)| {
            let to_centre = flatten(junction.centre() - query.position);
            if forward.dot(to_centre) <= 0.0 {
                return false;
            }
            junction.approaches().iter().enumerate().any(|(idx, approach)| {
                let offset = flatten(approach.position - query.position);
                let dist = offset.magnitude();
                dist <= distance
                    && dist < to_centre.magnitude()
                    && forward.dot(offset) > 0.0
                    && junction.should_stop_at(idx, dist, query, occupancy)
            })
        })
    }
}
