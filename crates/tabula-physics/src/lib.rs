//! Scroll physics for Tabula: drag tracking, flings, rubber-banding, paging
//! and zoom.

pub mod config;
pub mod decay;
pub mod easing;
pub mod events;
pub mod gesture_constants;
pub mod input;
pub mod rubber_band;
pub mod scroll;
pub mod spring;
pub mod velocity_tracker;

pub use config::{ScrollBehavior, ScrollConfig, DEFAULT_SCROLL_ANIMATION_MS};
pub use decay::{DecayMotion, DecelerationRate};
pub use easing::Easing;
pub use events::{ListenerId, ScrollEvent, ScrollListener, ScrollListeners};
pub use input::InputEvent;
pub use rubber_band::RubberBand;
pub use scroll::{Axis, GeometryGate, ScrollPhase, ScrollPhysics};
pub use spring::{SpringMotion, SpringSpec};
pub use velocity_tracker::VelocityTracker;
