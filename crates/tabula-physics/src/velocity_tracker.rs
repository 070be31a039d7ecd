//! Release velocity estimation for drags.
//!
//! Uses the impulse strategy: the samples are treated as successive pushes on
//! a unit mass and the velocity is recovered from the accumulated kinetic
//! energy. Only samples from the last [`HORIZON_MS`] are considered, and a gap
//! longer than [`ASSUME_STOPPED_MS`] means the pointer came to rest.

use tabula_core::Point;

const HISTORY: usize = 20;

/// Samples older than this (relative to the newest) are ignored.
pub const HORIZON_MS: i64 = 100;

/// A pause this long between samples means the pointer had stopped.
pub const ASSUME_STOPPED_MS: i64 = 40;

#[derive(Debug, Clone, Copy, Default)]
struct Sample {
    time_ms: i64,
    position: f32,
}

/// Velocity along one axis, from absolute positions.
#[derive(Debug, Clone)]
pub struct AxisVelocityTracker {
    ring: [Option<Sample>; HISTORY],
    head: usize,
}

impl Default for AxisVelocityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AxisVelocityTracker {
    pub fn new() -> Self {
        Self {
            ring: [None; HISTORY],
            head: 0,
        }
    }

    pub fn add(&mut self, time_ms: i64, position: f32) {
        self.head = (self.head + 1) % HISTORY;
        self.ring[self.head] = Some(Sample { time_ms, position });
    }

    /// Velocity in units per second; zero with fewer than two usable samples.
    pub fn velocity(&self) -> f32 {
        let Some(newest) = self.ring[self.head] else {
            return 0.0;
        };

        // Newest first, ages as negative times relative to the newest sample.
        let mut positions = [0.0f32; HISTORY];
        let mut times = [0.0f32; HISTORY];
        let mut count = 0;
        let mut cursor = self.head;
        let mut previous_time = newest.time_ms;
        while let Some(sample) = self.ring[cursor] {
            let age = newest.time_ms - sample.time_ms;
            let gap = (previous_time - sample.time_ms).abs();
            if age > HORIZON_MS || gap > ASSUME_STOPPED_MS {
                break;
            }
            positions[count] = sample.position;
            times[count] = -(age as f32);
            previous_time = sample.time_ms;
            count += 1;
            if count == HISTORY {
                break;
            }
            cursor = (cursor + HISTORY - 1) % HISTORY;
        }

        if count < 2 {
            return 0.0;
        }
        impulse_velocity(&positions[..count], &times[..count]) * 1000.0
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Velocity per millisecond from samples ordered newest first.
fn impulse_velocity(positions: &[f32], times: &[f32]) -> f32 {
    let oldest = positions.len() - 1;
    let mut work = 0.0f32;
    for i in (1..=oldest).rev() {
        let (t_from, t_to) = (times[i], times[i - 1]);
        if t_from == t_to {
            continue;
        }
        let segment = (positions[i - 1] - positions[i]) / (t_to - t_from);
        let previous = energy_to_velocity(work);
        work += (segment - previous) * segment.abs();
        if i == oldest {
            work *= 0.5;
        }
    }
    energy_to_velocity(work)
}

#[inline]
fn energy_to_velocity(energy: f32) -> f32 {
    energy.signum() * (2.0 * energy.abs()).sqrt()
}

/// Two-axis tracker fed with pointer positions.
#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    x: AxisVelocityTracker,
    y: AxisVelocityTracker,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, time_ms: i64, position: Point) {
        self.x.add(time_ms, position.x);
        self.y.add(time_ms, position.y);
    }

    /// Pointer velocity in pixels per second, each axis clamped to
    /// `±max_velocity`.
    pub fn velocity(&self, max_velocity: f32) -> Point {
        let clamp = |v: f32| {
            if !v.is_finite() || max_velocity <= 0.0 {
                0.0
            } else {
                v.clamp(-max_velocity, max_velocity)
            }
        };
        Point::new(clamp(self.x.velocity()), clamp(self.y.velocity()))
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_motion_reports_its_speed() {
        let mut tracker = AxisVelocityTracker::new();
        for step in 0..6 {
            tracker.add(step * 10, step as f32 * 20.0);
        }
        let velocity = tracker.velocity();
        assert!((velocity - 2_000.0).abs() < 100.0, "velocity {velocity}");
    }

    #[test]
    fn single_sample_has_no_velocity() {
        let mut tracker = AxisVelocityTracker::new();
        tracker.add(0, 10.0);
        assert_eq!(tracker.velocity(), 0.0);
    }

    #[test]
    fn pause_before_release_means_rest() {
        let mut tracker = AxisVelocityTracker::new();
        tracker.add(0, 0.0);
        tracker.add(10, 50.0);
        tracker.add(100, 50.0);
        assert_eq!(tracker.velocity(), 0.0);
    }

    #[test]
    fn two_axis_velocity_is_clamped() {
        let mut tracker = VelocityTracker::new();
        for step in 0..5 {
            tracker.add(step * 8, Point::new(0.0, -(step as f32) * 200.0));
        }
        let velocity = tracker.velocity(8_000.0);
        assert_eq!(velocity.x, 0.0);
        assert_eq!(velocity.y, -8_000.0);
    }
}
