//! Damped spring used for bounce-back and zoom correction.

use crate::gesture_constants::MAX_FRAME_STEP;

/// Integration step; small enough to keep stiff springs stable.
const SUBSTEP: f32 = 1.0 / 240.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringSpec {
    /// 1.0 = critically damped, < 1.0 = bouncy, > 1.0 = over-damped.
    pub damping_ratio: f32,
    pub stiffness: f32,
    /// The spring is at rest once slower than this (units per second)...
    pub velocity_threshold: f32,
    /// ...and closer to its target than this.
    pub position_threshold: f32,
}

impl SpringSpec {
    /// Critically damped snap-back for offsets, thresholds in pixels.
    pub fn snap_back() -> Self {
        Self {
            damping_ratio: 1.0,
            stiffness: 400.0,
            velocity_threshold: 5.0,
            position_threshold: 0.5,
        }
    }

    /// Correction spring for zoom scales, thresholds in scale units.
    pub fn zoom() -> Self {
        Self {
            damping_ratio: 1.0,
            stiffness: 400.0,
            velocity_threshold: 0.01,
            position_threshold: 0.001,
        }
    }

    pub fn bouncy(self) -> Self {
        Self {
            damping_ratio: 0.5,
            ..self
        }
    }

    pub fn stiff(self) -> Self {
        Self {
            stiffness: self.stiffness * 2.0,
            ..self
        }
    }
}

impl Default for SpringSpec {
    fn default() -> Self {
        Self::snap_back()
    }
}

/// One value pulled toward a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringMotion {
    pub position: f32,
    pub velocity: f32,
    pub target: f32,
    spec: SpringSpec,
}

impl SpringMotion {
    pub fn new(spec: SpringSpec, position: f32, velocity: f32, target: f32) -> Self {
        Self {
            position,
            velocity,
            target,
            spec,
        }
    }

    /// Advances by `dt` seconds with semi-implicit Euler substeps.
    pub fn advance(&mut self, dt: f32) {
        let dt = dt.clamp(0.0, MAX_FRAME_STEP);
        let stiffness = self.spec.stiffness;
        let damping = 2.0 * self.spec.damping_ratio * stiffness.sqrt();
        let mut elapsed = 0.0;
        while elapsed < dt {
            let step = SUBSTEP.min(dt - elapsed);
            let displacement = self.position - self.target;
            let force = -stiffness * displacement - damping * self.velocity;
            self.velocity += force * step;
            self.position += self.velocity * step;
            elapsed += step;
        }
    }

    pub fn is_settled(&self) -> bool {
        self.velocity.abs() < self.spec.velocity_threshold
            && (self.position - self.target).abs() < self.spec.position_threshold
    }

    /// Jumps to the target and stops.
    pub fn settle(&mut self) {
        self.position = self.target;
        self.velocity = 0.0;
    }

    pub(crate) fn shift(&mut self, delta: f32) {
        self.position += delta;
        self.target += delta;
    }
}
