//! Scroll notifications.

use tabula_core::{Listener, Listeners, Point};

pub use tabula_core::ListenerId;

/// Notification published by the scroll surface.
///
/// Listeners receive `&mut ScrollEvent`; only
/// [`ScrollEvent::WillEndDragging`] reads a modified value back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollEvent {
    DidScroll { offset: Point },
    WillBeginDragging { offset: Point },
    /// `target` is where the content will come to rest, already clamped to
    /// the bounds. Changing it redirects the deceleration.
    WillEndDragging { velocity: Point, target: Point },
    DidEndDragging { will_decelerate: bool },
    WillBeginDecelerating,
    DidEndDecelerating { offset: Point },
    /// A programmatic animated offset or zoom change finished.
    DidEndScrollingAnimation { offset: Point },
    DidScrollToTop,
    WillBeginZooming,
    DidZoom { scale: f32 },
    DidEndZooming { scale: f32 },
}

pub type ScrollListener = Listener<ScrollEvent>;

pub type ScrollListeners = Listeners<ScrollEvent>;
