//! Tests of junction right-of-way with cars parked at the approaches.

use traffic_drive::math::{Point3d, Pose};
use traffic_drive::{
    Approach, AxisInput, JunctionAttributes, JunctionId, LightState, Simulation, VehicleId,
};

/// Parks a player-only car at a position.
fn park(sim: &mut Simulation, x: f64, z: f64) -> VehicleId {
    sim.add_vehicle(&Default::default(), Pose::from_yaw(Point3d::new(x, 0.5, z), 0.0))
}

/// Advances the junction cycles without moving any car.
fn wait(sim: &mut Simulation, seconds: f64) {
    let frames = (seconds / 0.25).round() as usize;
    for _ in 0..frames {
        sim.frame(0.25, &AxisInput::default());
    }
}

fn add_junction(sim: &mut Simulation, approaches: Vec<Approach>, cycle_time: f64) -> JunctionId {
    sim.add_junction(&JunctionAttributes {
        approaches,
        cycle_time,
        ..Default::default()
    })
}

/// Two cars arrive together at a two-way stop: the green leg goes first,
/// then the roles swap when the cycle moves on.
#[test]
fn two_way_stop_roles_swap_with_cycle() {
    let mut sim = Simulation::new();
    let junction = add_junction(
        &mut sim,
        vec![
            Approach::stop(Point3d::new(0.0, 0.0, -10.0)),
            Approach::stop(Point3d::new(10.0, 0.0, 0.0)),
        ],
        5.0,
    );
    let a = park(&mut sim, 0.0, -12.0);
    let b = park(&mut sim, 12.0, 0.0);

    assert!(!sim.should_stop_for_car(junction, a));
    assert!(sim.should_stop_for_car(junction, b));

    wait(&mut sim, 4.75);
    assert!(!sim.should_stop_for_car(junction, a));
    assert!(sim.should_stop_for_car(junction, b));

    wait(&mut sim, 0.25);
    let controller = sim.get_junction(junction).unwrap();
    assert_eq!(controller.green_index(), Some(1));
    assert!(sim.should_stop_for_car(junction, a));
    assert!(!sim.should_stop_for_car(junction, b));
}

/// A lone car at an all-way stop never waits, whatever the cycle says.
#[test]
fn lone_car_at_three_way_stop_goes() {
    let mut sim = Simulation::new();
    let junction = add_junction(
        &mut sim,
        vec![
            Approach::stop(Point3d::new(0.0, 0.0, -10.0)),
            Approach::stop(Point3d::new(10.0, 0.0, 0.0)),
            Approach::stop(Point3d::new(-10.0, 0.0, 0.0)),
        ],
        2.0,
    );
    let car = park(&mut sim, -11.0, 1.0);
    for _ in 0..40 {
        assert!(!sim.should_stop_for_car(junction, car));
        wait(&mut sim, 0.25);
    }
}

/// With three of four approaches occupied, exactly the green one may go.
#[test]
fn busy_four_way_stop_releases_green_only() {
    let mut sim = Simulation::new();
    let junction = add_junction(
        &mut sim,
        vec![
            Approach::stop(Point3d::new(0.0, 0.0, -10.0)),
            Approach::stop(Point3d::new(10.0, 0.0, 0.0)),
            Approach::stop(Point3d::new(0.0, 0.0, 10.0)),
            Approach::stop(Point3d::new(-10.0, 0.0, 0.0)),
        ],
        3.0,
    );
    let cars = [
        park(&mut sim, 0.0, -12.0),
        park(&mut sim, 12.0, 0.0),
        park(&mut sim, -12.0, 0.0),
    ];
    let legs = [0, 1, 3];

    for _ in 0..8 {
        let green = sim.get_junction(junction).and_then(|j| j.green_index());
        for (car, leg) in cars.iter().zip(legs) {
            let stops = sim.should_stop_for_car(junction, *car);
            assert_eq!(stops, Some(leg) != green);
        }
        wait(&mut sim, 3.0);
    }
}

/// The car at the green light of a mixed junction always goes.
#[test]
fn green_light_of_mixed_junction_goes() {
    let mut sim = Simulation::new();
    let junction = add_junction(
        &mut sim,
        vec![
            Approach::light(Point3d::new(0.0, 0.0, -10.0)),
            Approach::stop(Point3d::new(10.0, 0.0, 0.0)),
            Approach::light(Point3d::new(0.0, 0.0, 10.0)),
        ],
        10.0,
    );
    let green = park(&mut sim, 0.0, -11.0);
    let side = park(&mut sim, 11.0, 0.0);
    let opposite = park(&mut sim, 0.0, 11.0);

    let controller = sim.get_junction(junction).unwrap();
    assert_eq!(controller.signal(0), Some(LightState::Green));
    assert_eq!(controller.signal(1), Some(LightState::Stop));
    assert_eq!(controller.signal(2), Some(LightState::Red));

    assert!(!sim.should_stop_for_car(junction, green));
    assert!(sim.should_stop_for_car(junction, side));
    assert!(sim.should_stop_for_car(junction, opposite));
}

/// A stop leg keeps yielding for a while after the green leg clears.
#[test]
fn stop_leg_yields_through_grace_window() {
    let mut sim = Simulation::new();
    let junction = add_junction(
        &mut sim,
        vec![
            Approach::light(Point3d::new(0.0, 0.0, -10.0)),
            Approach::stop(Point3d::new(10.0, 0.0, 0.0)),
        ],
        10.0,
    );
    let through = park(&mut sim, 0.0, -11.0);
    let waiting = park(&mut sim, 11.0, 0.0);

    wait(&mut sim, 1.0);
    assert!(sim.should_stop_for_car(junction, waiting));

    // The green leg clears at t = 1
    sim.remove_vehicle(through);
    wait(&mut sim, 3.0);
    assert!(sim.should_stop_for_car(junction, waiting));
    wait(&mut sim, 0.25);
    assert!(!sim.should_stop_for_car(junction, waiting));
}

/// Deactivated junctions do not cycle until they are reactivated.
#[test]
fn inactive_junction_is_frozen() {
    let mut sim = Simulation::new();
    let junction = add_junction(
        &mut sim,
        vec![
            Approach::light(Point3d::new(0.0, 0.0, -10.0)),
            Approach::light(Point3d::new(10.0, 0.0, 0.0)),
        ],
        1.0,
    );
    sim.set_junction_active(junction, false);
    wait(&mut sim, 5.0);
    let controller = sim.get_junction(junction).unwrap();
    assert_eq!(controller.green_index(), Some(0));
    assert_eq!(controller.clock(), 0.0);
    assert_eq!(sim.iter_junctions().count(), 0);

    sim.set_junction_active(junction, true);
    wait(&mut sim, 1.0);
    assert_eq!(sim.get_junction(junction).and_then(|j| j.green_index()), Some(1));
}
