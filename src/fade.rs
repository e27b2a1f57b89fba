//! Opacity curve for the cross-fade between grid cells.
//!
//! The fade uses the "fast out, slow in" cubic bezier `(0.4, 0.0, 0.2, 1.0)`,
//! the usual default for UI tweens. The curve is monotonic on `[0, 1]`, so a
//! fade never overshoots or reverses.

use std::time::Duration;

/// A timing curve from `(0, 0)` to `(1, 1)` shaped by two control points,
/// as in CSS `cubic-bezier(x1, y1, x2, y2)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

pub const FAST_OUT_SLOW_IN: CubicBezier = CubicBezier::new(0.4, 0.0, 0.2, 1.0);

const SOLVE_EPSILON: f64 = 1e-9;
const SOLVE_ITERATIONS: usize = 32;

impl CubicBezier {
    /// `x1` and `x2` must lie in `[0, 1]` so that x grows with the curve parameter.
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Map linear progress `t` to eased progress. Input is clamped to `[0, 1]`.
    pub fn ease(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        let s = self.solve_x(t as f64);
        coordinate(s, self.y1, self.y2) as f32
    }

    /// Curve parameter whose x coordinate is `x`.
    ///
    /// Newton steps that stay inside the current bracket are taken as is;
    /// anything else halves the bracket instead.
    fn solve_x(&self, x: f64) -> f64 {
        let (mut lo, mut hi) = (0.0, 1.0);
        let mut s = x;
        for _ in 0..SOLVE_ITERATIONS {
            let err = coordinate(s, self.x1, self.x2) - x;
            if err.abs() < SOLVE_EPSILON {
                break;
            }
            if err > 0.0 {
                hi = s;
            } else {
                lo = s;
            }
            let slope = slope(s, self.x1, self.x2);
            let newton = s - err / slope;
            s = if slope > SOLVE_EPSILON && newton > lo && newton < hi {
                newton
            } else {
                (lo + hi) * 0.5
            };
        }
        s
    }
}

/// One axis of the curve at parameter `s`; the end points are fixed at 0 and 1.
fn coordinate(s: f64, p1: f64, p2: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn slope(s: f64, p1: f64, p2: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// Ease a linear progress value (0.0 to 1.0) along the fast-out-slow-in curve.
pub fn fast_out_slow_in(t: f32) -> f32 {
    FAST_OUT_SLOW_IN.ease(t)
}

/// Eased progress of `elapsed` through a tween lasting `duration`.
pub fn progress(elapsed: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    let linear = (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0);
    fast_out_slow_in(linear as f32)
}
