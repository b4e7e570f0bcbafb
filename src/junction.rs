use crate::agent::Occupancy;
use crate::debug::debug_sphere;
use crate::math::{flat_distance, Point3d};
use crate::VehicleId;
use arrayvec::ArrayVec;
use cgmath::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The maximum number of approaches a junction may have.
pub const MAX_APPROACHES: usize = 4;

/// The shortest accepted cycle time in s.
const MIN_CYCLE_TIME: f64 = 0.1; // s

/// The weakest accepted braking deceleration in m/s^2.
const MIN_BRAKE_ACCEL: f64 = 0.01; // m/s^2

/// A junction which cycles right-of-way between its approaches.
///
/// Exactly one approach is green at any instant. Light-controlled legs stop on red,
/// while stop legs only yield when the green leg is busy or another approach is contending.
#[derive(Clone, Debug)]
pub struct JunctionController {
    /// The approaches, in cycle order.
    approaches: ArrayVec<Approach, MAX_APPROACHES>,
    /// The time each approach stays green, in s.
    cycle_time: f64,
    /// Cars within this radius of an approach are "at" that approach, in m.
    stop_radius: f64,
    /// How long stop legs keep yielding after the green leg was last occupied, in s.
    grace_window: f64,
    /// Extra distance added to braking distances, in m.
    stop_margin: f64,
    /// The index of the green approach.
    green: usize,
    /// The time since the green approach last changed, in s.
    timer: f64,
    /// The time since the junction was created, in s.
    clock: f64,
    /// The clock time at which the green approach was last occupied or switched.
    last_green_occupied: f64,
}

/// One leg of a junction.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Approach {
    /// The stop point of the approach.
    pub position: Point3d,
    /// Whether the leg has a stop sign rather than a traffic light.
    pub stop_leg: bool,
}

/// The attributes of a junction.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JunctionAttributes {
    /// The approaches, between two and four of them.
    pub approaches: Vec<Approach>,
    /// The time each approach stays green, in s.
    pub cycle_time: f64,
    /// Cars within this radius of an approach are at that approach, in m.
    pub stop_radius: f64,
    /// How long stop legs keep yielding after the green leg was last occupied, in s.
    pub grace_window: f64,
    /// Extra distance added to braking distances, in m.
    pub stop_margin: f64,
}

/// The signal shown on an approach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightState {
    Green,
    Red,
    /// A stop sign which is not currently green.
    Stop,
}

/// A car asking whether it must stop.
#[derive(Clone, Copy, Debug)]
pub struct StopQuery {
    /// The car's position.
    pub position: Point3d,
    /// The car's speed in m/s.
    pub speed: f64,
    /// The deceleration the car brakes with, in m/s^2.
    pub brake_accel: f64,
    /// The car asking, which is ignored when counting occupied approaches.
    pub vehicle: Option<VehicleId>,
}

impl Approach {
    /// An approach controlled by a traffic light.
    pub fn light(position: Point3d) -> Self {
        Self {
            position,
            stop_leg: false,
        }
    }

    /// An approach controlled by a stop sign.
    pub fn stop(position: Point3d) -> Self {
        Self {
            position,
            stop_leg: true,
        }
    }
}

impl Default for JunctionAttributes {
    fn default() -> Self {
        Self {
            approaches: vec![],
            cycle_time: 5.0,
            stop_radius: 6.0,
            grace_window: 3.0,
            stop_margin: 1.0,
        }
    }
}

impl JunctionController {
    /// Creates a new junction with the first approach green.
    pub fn new(attributes: &JunctionAttributes) -> Self {
        let count = attributes.approaches.len();
        if count > MAX_APPROACHES {
            log::warn!("junction has {count} approaches, ignoring all but the first {MAX_APPROACHES}");
        } else if count == 1 {
            log::warn!("junction has a single approach");
        }
        if attributes.cycle_time < MIN_CYCLE_TIME {
            log::warn!("junction cycle time {} is too short", attributes.cycle_time);
        }
        Self {
            approaches: attributes
                .approaches
                .iter()
                .copied()
                .take(MAX_APPROACHES)
                .collect(),
            cycle_time: f64::max(attributes.cycle_time, MIN_CYCLE_TIME),
            stop_radius: f64::max(attributes.stop_radius, 0.0),
            grace_window: attributes.grace_window,
            stop_margin: attributes.stop_margin,
            green: 0,
            timer: 0.0,
            clock: 0.0,
            last_green_occupied: 0.0,
        }
    }

    /// The approaches, in cycle order.
    pub fn approaches(&self) -> &[Approach] {
        &self.approaches
    }

    /// The index of the approach that currently has right-of-way,
    /// or `None` if the junction has no approaches.
    pub fn green_index(&self) -> Option<usize> {
        (!self.approaches.is_empty()).then_some(self.green)
    }

    /// The time each approach stays green, in s.
    pub fn cycle_time(&self) -> f64 {
        self.cycle_time
    }

    /// The radius around each approach within which a car is at that approach, in m.
    pub fn stop_radius(&self) -> f64 {
        self.stop_radius
    }

    /// The time since the junction was created, in s.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// The centroid of the approaches.
    pub fn centre(&self) -> Point3d {
        if self.approaches.is_empty() {
            return Point3d::origin();
        }
        Point3d::centroid(
            &self
                .approaches
                .iter()
                .map(|a| a.position)
                .collect::<ArrayVec<_, MAX_APPROACHES>>(),
        )
    }

    /// Whether every approach is a stop leg, i.e. an all-way stop.
    pub fn is_pure_stop(&self) -> bool {
        self.approaches.iter().all(|a| a.stop_leg)
    }

    /// The signal currently shown on an approach.
    pub fn signal(&self, idx: usize) -> Option<LightState> {
        let approach = self.approaches.get(idx)?;
        Some(match (idx == self.green, approach.stop_leg) {
            (true, _) => LightState::Green,
            (false, true) => LightState::Stop,
            (false, false) => LightState::Red,
        })
    }

    /// Advances the cycle by `dt` seconds and records whether the green approach is occupied.
    pub fn step<O: Occupancy + ?Sized>(&mut self, dt: f64, occupancy: &O) {
        if self.approaches.is_empty() {
            return;
        }

        self.clock += dt;
        self.timer += dt;
        while self.timer >= self.cycle_time {
            self.timer -= self.cycle_time;
            self.green = (self.green + 1) % self.approaches.len();
            self.last_green_occupied = self.clock;
            log::debug!("junction switched green to approach {}", self.green);
        }

        let green = self.approaches[self.green].position;
        if occupancy.is_occupied(green, self.stop_radius, None) {
            self.last_green_occupied = self.clock;
        }

        for approach in &self.approaches {
            debug_sphere("stop radius", approach.position, self.stop_radius);
        }
    }

    /// Finds the nearest approach within the stop radius of `position`,
    /// returning its index and flattened distance.
    pub fn approach_at(&self, position: Point3d) -> Option<(usize, f64)> {
        self.approaches
            .iter()
            .map(|a| flat_distance(position, a.position))
            .enumerate()
            .filter(|(_, dist)| *dist <= self.stop_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Whether `position` is within the stop radius of any approach.
    pub fn is_car_at_this_junction(&self, position: Point3d) -> bool {
        self.approach_at(position).is_some()
    }

    /// Determines whether a car must stop.
    /// Returns `false` if the car is not at any approach of this junction.
    pub fn should_stop_for_car<O: Occupancy + ?Sized>(
        &self,
        query: &StopQuery,
        occupancy: &O,
    ) -> bool {
        match self.approach_at(query.position) {
            Some((idx, dist)) => self.should_stop_at(idx, dist, query, occupancy),
            None => false,
        }
    }

    /// Determines whether a car `dist` metres from approach `idx` must stop.
    pub(crate) fn should_stop_at<O: Occupancy + ?Sized>(
        &self,
        idx: usize,
        dist: f64,
        query: &StopQuery,
        occupancy: &O,
    ) -> bool {
        let Some(approach) = self.approaches.get(idx) else {
            return false;
        };

        // All-way stop: go when alone, otherwise the cycle breaks the tie
        if self.is_pure_stop() {
            return self.is_contended(idx, query.vehicle, occupancy) && idx != self.green;
        }

        if idx == self.green {
            return false;
        }

        // Red light
        if !approach.stop_leg {
            let stopping = stopping_distance(query.speed, query.brake_accel, self.stop_margin);
            return dist <= f64::max(self.stop_radius, stopping);
        }

        // Stop leg beside a traffic light: yield while the green leg is busy or just cleared
        let green = self.approaches[self.green].position;
        if occupancy.is_occupied(green, self.stop_radius, query.vehicle) || self.within_grace() {
            return true;
        }
        self.is_contended(idx, query.vehicle, occupancy)
    }

    /// Whether the green leg was occupied, or switched, within the grace window.
    fn within_grace(&self) -> bool {
        self.clock - self.last_green_occupied <= self.grace_window
    }

    /// Whether at least two approaches are occupied, counting `idx` as occupied by the querying car.
    fn is_contended<O: Occupancy + ?Sized>(
        &self,
        idx: usize,
        vehicle: Option<VehicleId>,
        occupancy: &O,
    ) -> bool {
        let others = self
            .approaches
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .filter(|(_, a)| occupancy.is_occupied(a.position, self.stop_radius, vehicle))
            .count();
        1 + others >= 2
    }
}

/// The distance needed to stop from `speed` at `brake_accel`, plus a margin, in m.
pub(crate) fn stopping_distance(speed: f64, brake_accel: f64, margin: f64) -> f64 {
    speed * speed / (2.0 * f64::max(brake_accel, MIN_BRAKE_ACCEL)) + margin
}
