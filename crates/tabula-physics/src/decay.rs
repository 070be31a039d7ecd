//! Exponential deceleration.
//!
//! Velocity decays geometrically: after `t` milliseconds it is
//! `v0 * rate^t`. Integrating gives the position curve and the total
//! projected travel `-v0 / (1000 * ln(rate))`.

/// Per-millisecond velocity retention factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecelerationRate(f32);

impl DecelerationRate {
    /// Long, gliding deceleration.
    pub const NORMAL: DecelerationRate = DecelerationRate(0.998);
    /// Short deceleration, used for paging.
    pub const FAST: DecelerationRate = DecelerationRate(0.99);

    /// Rates outside `[0.5, 0.9999]` are clamped.
    pub fn new(rate: f32) -> Self {
        if !rate.is_finite() {
            return Self::NORMAL;
        }
        Self(rate.clamp(0.5, 0.9999))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    #[inline]
    fn ln(self) -> f32 {
        self.0.ln()
    }

    /// Distance travelled before coming to rest from `velocity` px/s.
    pub fn projected_distance(self, velocity: f32) -> f32 {
        -velocity / (1000.0 * self.ln())
    }

    /// Initial velocity (px/s) that comes to rest after `distance`.
    pub fn velocity_for_distance(self, distance: f32) -> f32 {
        -distance * 1000.0 * self.ln()
    }
}

impl Default for DecelerationRate {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// One axis of a fling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayMotion {
    origin: f32,
    velocity: f32,
    rate: DecelerationRate,
    rest: f32,
}

impl DecayMotion {
    pub fn new(origin: f32, velocity: f32, rate: DecelerationRate) -> Self {
        Self {
            origin,
            velocity,
            rate,
            rest: origin + rate.projected_distance(velocity),
        }
    }

    /// A motion from `origin` that comes to rest exactly at `target`.
    pub fn toward(origin: f32, target: f32, rate: DecelerationRate) -> Self {
        Self {
            rest: target,
            ..Self::new(origin, rate.velocity_for_distance(target - origin), rate)
        }
    }

    pub fn value_at(&self, elapsed_ms: f32) -> f32 {
        let decayed = self.rate.value().powf(elapsed_ms.max(0.0));
        self.origin + self.velocity / 1000.0 * (decayed - 1.0) / self.rate.ln()
    }

    pub fn velocity_at(&self, elapsed_ms: f32) -> f32 {
        self.velocity * self.rate.value().powf(elapsed_ms.max(0.0))
    }

    pub fn target(&self) -> f32 {
        self.rest
    }

    pub(crate) fn shift(&mut self, delta: f32) {
        self.origin += delta;
        self.rest += delta;
    }
}
