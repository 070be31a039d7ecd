use tabula_core::Size;

use crate::decay::DecelerationRate;
use crate::easing::Easing;
use crate::gesture_constants::{DIRECTIONAL_LOCK_RATIO, DRAG_THRESHOLD, MAX_FLING_VELOCITY, MIN_FLING_VELOCITY};
use crate::rubber_band::RubberBand;
use crate::spring::SpringSpec;

/// Default duration of animated offset and zoom changes.
pub const DEFAULT_SCROLL_ANIMATION_MS: u64 = 300;

/// Tuning for the scroll surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollConfig {
    pub slop: f32,
    pub deceleration_rate: DecelerationRate,
    pub min_fling_velocity: f32,
    pub max_fling_velocity: f32,
    pub rubber_band: RubberBand,
    pub bounce_spring: SpringSpec,
    pub zoom_bounce_spring: SpringSpec,
    pub scroll_animation_ms: u64,
    pub scroll_easing: Easing,
    /// Page length for paging; `None` pages by the viewport.
    pub page_size: Option<Size>,
    pub directional_lock_ratio: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            slop: DRAG_THRESHOLD,
            deceleration_rate: DecelerationRate::NORMAL,
            min_fling_velocity: MIN_FLING_VELOCITY,
            max_fling_velocity: MAX_FLING_VELOCITY,
            rubber_band: RubberBand::default(),
            bounce_spring: SpringSpec::snap_back(),
            zoom_bounce_spring: SpringSpec::zoom(),
            scroll_animation_ms: DEFAULT_SCROLL_ANIMATION_MS,
            scroll_easing: Easing::default(),
            page_size: None,
            directional_lock_ratio: DIRECTIONAL_LOCK_RATIO,
        }
    }
}

impl ScrollConfig {
    pub fn with_deceleration_rate(mut self, rate: DecelerationRate) -> Self {
        self.deceleration_rate = rate;
        self
    }

    pub fn with_page_size(mut self, page: Size) -> Self {
        self.page_size = Some(page);
        self
    }

    pub fn with_slop(mut self, slop: f32) -> Self {
        self.slop = slop.max(0.0);
        self
    }

    pub fn with_bounce_spring(mut self, spring: SpringSpec) -> Self {
        self.bounce_spring = spring;
        self
    }

    pub fn with_scroll_animation(mut self, duration_ms: u64, easing: Easing) -> Self {
        self.scroll_animation_ms = duration_ms;
        self.scroll_easing = easing;
        self
    }
}

/// Behaviour switches of the scroll surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollBehavior {
    pub scroll_enabled: bool,
    /// Offsets may pass the content bounds and spring back.
    pub bounces: bool,
    /// Bounce vertically even when the content fits the viewport.
    pub always_bounce_vertical: bool,
    pub always_bounce_horizontal: bool,
    /// Zoom scales may pass `[min, max]` and spring back.
    pub bounces_zoom: bool,
    pub paging: bool,
    /// Drags that start mostly along one axis stay on it.
    pub directional_lock: bool,
    pub scrolls_to_top: bool,
}

impl Default for ScrollBehavior {
    fn default() -> Self {
        Self {
            scroll_enabled: true,
            bounces: true,
            always_bounce_vertical: false,
            always_bounce_horizontal: false,
            bounces_zoom: true,
            paging: false,
            directional_lock: false,
            scrolls_to_top: true,
        }
    }
}
