use crate::math::{flat_distance, Point3d};

/// A cyclic list of waypoints followed by an AI driver.
#[derive(Clone, Debug, Default)]
pub struct WaypointRoute {
    waypoints: Vec<Point3d>,
    cursor: usize,
    switch_radius: f64,
    /// The waypoint last reached, until the vehicle leaves its switch radius.
    reached: Option<usize>,
}

impl WaypointRoute {
    /// Creates a route starting at the first waypoint.
    pub fn new(waypoints: Vec<Point3d>, switch_radius: f64) -> Self {
        Self {
            waypoints,
            cursor: 0,
            switch_radius: f64::max(switch_radius, 0.0),
            reached: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn waypoints(&self) -> &[Point3d] {
        &self.waypoints
    }

    /// The index of the current target.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor, wrapping around the route.
    pub fn set_cursor(&mut self, cursor: usize) {
        if !self.is_empty() {
            self.cursor = cursor % self.len();
            self.reached = None;
        }
    }

    /// The current target, if the route has any waypoints.
    pub fn target(&self) -> Option<Point3d> {
        self.waypoints.get(self.cursor).copied()
    }

    /// Advances the cursor once the vehicle at `position` gets within the switch radius
    /// of the current target. Returns whether the cursor moved.
    ///
    /// A waypoint only advances the cursor once per visit: the vehicle must leave its
    /// switch radius before it can do so again.
    pub fn advance(&mut self, position: Point3d) -> bool {
        let within = |idx: usize| flat_distance(position, self.waypoints[idx]) < self.switch_radius;

        if let Some(reached) = self.reached {
            if within(reached) {
                return false;
            }
            self.reached = None;
        }

        let Some(target) = self.target() else {
            return false;
        };
        if flat_distance(position, target) >= self.switch_radius {
            return false;
        }
        self.reached = Some(self.cursor);
        self.cursor = (self.cursor + 1) % self.len();
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn square() -> WaypointRoute {
        let points = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        WaypointRoute::new(
            points.map(|(x, z)| Point3d::new(x, 0.0, z)).to_vec(),
            2.0,
        )
    }

    #[test]
    fn advances_cyclically() {
        let mut route = square();
        assert!(route.advance(Point3d::new(0.5, 3.0, 0.0)));
        assert_eq!(route.cursor(), 1);
        assert!(route.advance(Point3d::new(10.0, 0.0, 1.0)));
        assert!(route.advance(Point3d::new(10.0, 0.0, 10.0)));
        assert!(route.advance(Point3d::new(0.0, 0.0, 10.0)));
        assert_eq!(route.cursor(), 0);
        assert_eq!(route.target(), Some(Point3d::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn stays_put_outside_switch_radius() {
        let mut route = square();
        assert!(!route.advance(Point3d::new(5.0, 0.0, 5.0)));
        assert_eq!(route.cursor(), 0);
    }

    #[test]
    fn advances_once_per_visit() {
        // Two waypoints close enough to share a switch radius
        let mut route = WaypointRoute::new(
            vec![Point3d::new(0.0, 0.0, 0.0), Point3d::new(1.0, 0.0, 0.0)],
            2.0,
        );
        let here = Point3d::new(0.5, 0.0, 0.0);
        assert!(route.advance(here));
        assert_eq!(route.cursor(), 1);
        // Still inside the first waypoint's switch radius
        for _ in 0..10 {
            assert!(!route.advance(here));
        }
        assert_eq!(route.cursor(), 1);

        // Leave and come back
        assert!(!route.advance(Point3d::new(20.0, 0.0, 0.0)));
        assert!(route.advance(here));
        assert_eq!(route.cursor(), 0);
    }

    #[test]
    fn single_waypoint_does_not_spin() {
        let mut route = WaypointRoute::new(vec![Point3d::new(0.0, 0.0, 0.0)], 2.0);
        assert!(route.advance(Point3d::new(0.0, 0.0, 0.0)));
        assert!(!route.advance(Point3d::new(0.0, 0.0, 0.0)));
        assert_eq!(route.cursor(), 0);
    }

    #[test]
    fn empty_route_never_advances() {
        let mut route = WaypointRoute::new(vec![], 2.0);
        assert!(!route.advance(Point3d::new(0.0, 0.0, 0.0)));
        assert_eq!(route.target(), None);
        route.set_cursor(3);
        assert_eq!(route.cursor(), 0);
    }
}
