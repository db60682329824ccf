//! Circle fitting and arc measurement.
//!
//! The fitter never needs trigonometry while growing a window; the only
//! atan2 calls live in [`Circle::sweep_angle`], which runs once per emission
//! decision.

use crate::geometry::PointF;
use crate::CoordF;

use std::f64::consts::PI;

/// Relative tolerance for the collinearity test in the three-point solve.
const COLLINEARITY_EPSILON: CoordF = 1e-10;

/// A circle in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Center point.
    pub center: PointF,
    /// Radius (mm).
    pub radius: CoordF,
}

impl Circle {
    /// Create a circle from a center and radius.
    pub fn new(center: PointF, radius: CoordF) -> Self {
        Self { center, radius }
    }

    /// Find the circle passing through three points using the
    /// perpendicular-bisector intersection.
    ///
    /// Returns `None` when the points are colinear. The collinearity guard
    /// scales with the square of the largest coordinate magnitude so that
    /// far-from-origin toolpaths degenerate no earlier than near-origin ones.
    pub fn from_three_points(p1: PointF, p2: PointF, p3: PointF) -> Option<Circle> {
        let d = 2.0
            * (p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y));

        let magnitude = p1
            .x
            .abs()
            .max(p1.y.abs())
            .max(p2.x.abs())
            .max(p2.y.abs())
            .max(p3.x.abs())
            .max(p3.y.abs())
            .max(1.0);
        if d.abs() < COLLINEARITY_EPSILON * magnitude * magnitude {
            return None;
        }

        let sq1 = p1.x * p1.x + p1.y * p1.y;
        let sq2 = p2.x * p2.x + p2.y * p2.y;
        let sq3 = p3.x * p3.x + p3.y * p3.y;

        let ux = (sq1 * (p2.y - p3.y) + sq2 * (p3.y - p1.y) + sq3 * (p1.y - p2.y)) / d;
        let uy = (sq1 * (p3.x - p2.x) + sq2 * (p1.x - p3.x) + sq3 * (p2.x - p1.x)) / d;

        let center = PointF::new(ux, uy);
        Some(Circle {
            center,
            radius: center.distance_to(p1),
        })
    }

    /// Signed sweep angle from `start` to `end` walking the circle in the
    /// given rotation direction, normalized into `[0, 2π)`.
    pub fn sweep_angle(&self, start: PointF, end: PointF, clockwise: bool) -> CoordF {
        let start_angle = (start.y - self.center.y).atan2(start.x - self.center.x);
        let end_angle = (end.y - self.center.y).atan2(end.x - self.center.x);

        let mut sweep = if clockwise {
            start_angle - end_angle
        } else {
            end_angle - start_angle
        };
        if sweep < 0.0 {
            sweep += 2.0 * PI;
        }
        if sweep >= 2.0 * PI {
            sweep -= 2.0 * PI;
        }
        sweep
    }

    /// Arc length from `start` to `end` walking in the given direction.
    pub fn arc_length(&self, start: PointF, end: PointF, clockwise: bool) -> CoordF {
        self.radius * self.sweep_angle(start, end, clockwise)
    }

    /// Full circumference.
    #[inline]
    pub fn circumference(&self) -> CoordF {
        2.0 * PI * self.radius
    }

    /// Sagitta of the chord `a -> b`: the maximum perpendicular distance
    /// between the chord and the circle. Chords longer than the diameter
    /// clamp to the radius.
    pub fn chord_deviation(&self, a: PointF, b: PointF) -> CoordF {
        let half_chord = a.distance_to(b) / 2.0;
        if half_chord >= self.radius {
            return self.radius;
        }
        let discriminant = (self.radius * self.radius - half_chord * half_chord).max(0.0);
        self.radius - discriminant.sqrt()
    }

    /// Whether `p` lies on the circle within `epsilon`.
    #[inline]
    pub fn contains_point(&self, p: PointF, epsilon: CoordF) -> bool {
        (self.center.distance_to(p) - self.radius).abs() <= epsilon
    }
}
