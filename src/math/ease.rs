#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A cubic ease-in-out curve between two end points, with zero slope at both ends.
/// Inputs outside the end points are clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EaseCurve {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl EaseCurve {
    /// Creates a curve passing through `(x1, y1)` and `(x2, y2)`.
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Evaluates the curve.
    pub fn y(&self, x: f64) -> f64 {
        let w = self.x2 - self.x1;
        if w.abs() < 1e-9 {
            return self.y2;
        }
        let t = ((x - self.x1) / w).clamp(0.0, 1.0);
        let dy = self.y2 - self.y1;
        self.y1 + dy * t * t * (3.0 - 2.0 * t)
    }
}
