use crate::math::{Point3d, Vector3d};

/// The result of a successful [Surface::raycast].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// The distance from the ray origin to the hit point in m.
    pub distance: f64,
    /// The hit point in world space.
    pub point: Point3d,
    /// The surface normal at the hit point.
    pub normal: Vector3d,
}

/// The drivable environment, as seen by wheel probes.
pub trait Surface {
    /// Casts a ray from `origin` along the unit vector `dir`, returning the nearest
    /// drivable hit no further than `max_distance` away.
    fn raycast(&self, origin: Point3d, dir: Vector3d, max_distance: f64) -> Option<RayHit>;
}

/// An infinite horizontal drivable plane.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatGround {
    /// The height of the plane in m.
    pub height: f64,
}

/// A surface with nothing to drive on.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoGround;

impl FlatGround {
    pub fn new(height: f64) -> Self {
        Self { height }
    }
}

impl Surface for FlatGround {
    fn raycast(&self, origin: Point3d, dir: Vector3d, max_distance: f64) -> Option<RayHit> {
        // Only the top face is drivable
        if dir.y >= -1e-9 || origin.y < self.height {
            return None;
        }
        let distance = (self.height - origin.y) / dir.y;
        if distance > max_distance {
            return None;
        }
        Some(RayHit {
            distance,
            point: origin + distance * dir,
            normal: Vector3d::unit_y(),
        })
    }
}

impl Surface for NoGround {
    fn raycast(&self, _: Point3d, _: Vector3d, _: f64) -> Option<RayHit> {
        None
    }
}

impl<S: Surface> Surface for [S] {
    fn raycast(&self, origin: Point3d, dir: Vector3d, max_distance: f64) -> Option<RayHit> {
        self.iter()
            .filter_map(|s| s.raycast(origin, dir, max_distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn flat_ground_hits_from_above() {
        let ground = FlatGround::new(1.0);
        let hit = ground
            .raycast(Point3d::new(0.0, 3.0, 0.0), -Vector3d::unit_y(), 5.0)
            .unwrap();
        assert_approx_eq!(hit.distance, 2.0);
        assert_approx_eq!(hit.point.y, 1.0);

        assert!(ground
            .raycast(Point3d::new(0.0, 3.0, 0.0), -Vector3d::unit_y(), 1.5)
            .is_none());
        assert!(ground
            .raycast(Point3d::new(0.0, 0.0, 0.0), -Vector3d::unit_y(), 5.0)
            .is_none());
        assert!(ground
            .raycast(Point3d::new(0.0, 3.0, 0.0), Vector3d::unit_y(), 5.0)
            .is_none());
    }

    #[test]
    fn nearest_of_many() {
        let floors = [FlatGround::new(0.0), FlatGround::new(2.0)];
        let hit = floors[..]
            .raycast(Point3d::new(0.0, 5.0, 0.0), -Vector3d::unit_y(), 10.0)
            .unwrap();
        assert_approx_eq!(hit.distance, 3.0);
    }
}
