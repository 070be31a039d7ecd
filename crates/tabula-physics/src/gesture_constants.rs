//! Shared gesture thresholds.
//!
//! Values are in logical pixels (or pixels per second for velocities).

/// Distance the pointer must travel from the press position before a drag
/// begins. Below it the gesture is still a tap.
pub const DRAG_THRESHOLD: f32 = 8.0;

/// Fling velocities are clamped to this magnitude.
pub const MAX_FLING_VELOCITY: f32 = 8_000.0;

/// Release velocities below this magnitude do not start a fling.
pub const MIN_FLING_VELOCITY: f32 = 50.0;

/// A decelerating offset closer than this to its target snaps onto it.
pub const SETTLE_DISTANCE: f32 = 0.5;

/// A drag locks to one axis when its motion along that axis exceeds the
/// other by this factor.
pub const DIRECTIONAL_LOCK_RATIO: f32 = 2.0;

/// Longest frame interval integrated in a single tick, in seconds.
pub const MAX_FRAME_STEP: f32 = 0.1;
