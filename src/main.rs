use std::time::Instant;

use traffic_drive::math::{Point3d, Pose};
use traffic_drive::{
    Approach, AxisInput, DriverAttributes, FlatGround, JunctionAttributes, Simulation,
    VehicleAttributes,
};

fn main() {
    let mut sim = Simulation::new();
    let ground = FlatGround::new(0.0);

    // A rectangular loop with a light-controlled crossing on each long side
    let corners = [(0.0, 0.0), (0.0, 120.0), (60.0, 120.0), (60.0, 0.0)];
    let waypoints = corners
        .iter()
        .map(|&(x, z)| Point3d::new(x, 0.0, z))
        .collect::<Vec<_>>();
    for x in [0.0, 60.0] {
        sim.add_junction(&JunctionAttributes {
            approaches: vec![
                Approach::light(Point3d::new(x, 0.0, 50.0)),
                Approach::light(Point3d::new(x + 10.0, 0.0, 60.0)),
                Approach::light(Point3d::new(x, 0.0, 70.0)),
                Approach::stop(Point3d::new(x - 10.0, 0.0, 60.0)),
            ],
            ..Default::default()
        });
    }

    for z in [5.0, 25.0, 45.0, 90.0] {
        let attributes = VehicleAttributes {
            driver: Some(DriverAttributes {
                waypoints: waypoints.clone(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let id = sim.add_vehicle(&attributes, Pose::from_yaw(Point3d::new(0.0, 0.7, z), 0.0));
        if let Some(driver) = sim.get_vehicle_mut(id).and_then(|v| v.driver_mut()) {
            driver.route_mut().set_cursor(1);
        }
    }
    sim.randomise_cruise_speeds(0.1);

    println!("Simulating...");
    let num_frames = 1000;
    let input = AxisInput::default();
    for _ in 0..5 {
        let start = Instant::now();
        for _ in 0..num_frames {
            sim.step(0.05, &input, &ground);
        }
        let frame = start.elapsed() / num_frames;
        println!(
            "Avg. frame: {:?} --> {:.0}x speedup ({} vehs, t = {:.0} s)",
            frame,
            0.05 / frame.as_secs_f64(),
            sim.iter_vehicles().count(),
            sim.time(),
        );
    }
}
