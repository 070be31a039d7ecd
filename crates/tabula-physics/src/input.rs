use tabula_core::Point;

/// Pointer input, in viewport coordinates with millisecond timestamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Down { position: Point, time_ms: i64 },
    Move { position: Point, time_ms: i64 },
    Up { position: Point, time_ms: i64 },
    /// The platform took the gesture away.
    Cancel { time_ms: i64 },
    PinchBegin { focus: Point, time_ms: i64 },
    /// `scale` is relative to the scale at `PinchBegin`.
    PinchChange { focus: Point, scale: f32, time_ms: i64 },
    PinchEnd { time_ms: i64 },
}

impl InputEvent {
    pub fn time_ms(&self) -> i64 {
        match *self {
            InputEvent::Down { time_ms, .. }
            | InputEvent::Move { time_ms, .. }
            | InputEvent::Up { time_ms, .. }
            | InputEvent::Cancel { time_ms }
            | InputEvent::PinchBegin { time_ms, .. }
            | InputEvent::PinchChange { time_ms, .. }
            | InputEvent::PinchEnd { time_ms } => time_ms,
        }
    }
}
