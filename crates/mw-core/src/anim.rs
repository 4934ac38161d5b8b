//! Time-boxed tweens for camera moves and node enter/exit transitions.
//!
//! Tweens are sampled, never awaited: the caller passes the frame time and
//! reads back a value, so an animation in flight cannot block input.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Easing curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    #[default]
    CubicInOut,
    CubicOut,
}

impl Easing {
    /// Map linear progress `t ∈ [0, 1]` onto the curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::CubicInOut => {
                let t2 = t * 2.0;
                if t2 <= 1.0 {
                    t2 * t2 * t2 / 2.0
                } else {
                    let u = t2 - 2.0;
                    (u * u * u + 2.0) / 2.0
                }
            }
            Easing::CubicOut => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
        }
    }
}

/// Values that can be interpolated.
pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(self, to: Self, t: f64) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Point {
    fn lerp(self, to: Self, t: f64) -> Self {
        Point::new(self.x.lerp(to.x, t), self.y.lerp(to.y, t))
    }
}

/// A bounded-duration interpolation between two values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween<T: Lerp> {
    pub from: T,
    pub to: T,
    pub start_ms: f64,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl<T: Lerp> Tween<T> {
    pub fn new(from: T, to: T, start_ms: f64, duration_ms: f64, easing: Easing) -> Self {
        Self {
            from,
            to,
            start_ms,
            duration_ms,
            easing,
        }
    }

    /// Linear progress at `now_ms`, clamped to `[0, 1]`.
    pub fn progress(&self, now_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0)
    }

    pub fn sample(&self, now_ms: f64) -> T {
        let t = self.easing.apply(self.progress(now_ms));
        self.from.lerp(self.to, t)
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        self.progress(now_ms) >= 1.0
    }
}
