//! The scroll surface: offset, bounds, gestures and the animation slot.
//!
//! Phases move `Idle -> Tracking -> Dragging -> Decelerating -> Idle` for
//! drags and `Zooming -> ZoomBouncing -> Idle` for pinches. At most one
//! animation drives the offset at any time; starting a gesture or setting an
//! offset stops the current one first and publishes its end event.

use tabula_core::{EdgeInsets, Point, Rect, Size};

use crate::config::{ScrollBehavior, ScrollConfig};
use crate::decay::DecayMotion;
use crate::events::{ListenerId, ScrollEvent, ScrollListeners};
use crate::gesture_constants::{MAX_FRAME_STEP, SETTLE_DISTANCE};
use crate::input::InputEvent;
use crate::spring::SpringMotion;
use crate::velocity_tracker::VelocityTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollPhase {
    Idle,
    /// Pointer is down but has not passed the slop.
    Tracking,
    Dragging,
    /// Fling, targeted deceleration or bounce-back after release.
    Decelerating,
    Zooming,
    ZoomBouncing,
}

/// Whether layout may change geometry right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryGate {
    /// Nothing is moving; apply changes directly.
    Immediate,
    /// Apply changes and rebase the offset (and the gesture or animation in
    /// flight) by the length delta above the visible content.
    RebaseOffset,
    /// Hold geometry changes until the zoom settles.
    Defer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];

    #[inline]
    pub fn of(self, point: Point) -> f32 {
        match self {
            Axis::Horizontal => point.x,
            Axis::Vertical => point.y,
        }
    }

    #[inline]
    pub fn set(self, point: &mut Point, value: f32) {
        match self {
            Axis::Horizontal => point.x = value,
            Axis::Vertical => point.y = value,
        }
    }

    #[inline]
    pub fn length(self, size: Size) -> f32 {
        match self {
            Axis::Horizontal => size.width,
            Axis::Vertical => size.height,
        }
    }

    #[inline]
    fn index(self) -> usize {
        match self {
            Axis::Horizontal => 0,
            Axis::Vertical => 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum AxisMotion {
    Idle,
    Decay(DecayMotion),
    Spring(SpringMotion),
}

#[derive(Debug, Clone)]
struct Fling {
    axes: [AxisMotion; 2],
    start_nanos: Option<u64>,
    last_nanos: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
struct Tween {
    from: Point,
    to: Point,
    from_scale: f32,
    to_scale: f32,
    duration_ms: u64,
    start_nanos: Option<u64>,
    to_top: bool,
}

#[derive(Debug, Clone, Copy)]
struct ZoomBounce {
    spring: SpringMotion,
    focus: Point,
    last_nanos: Option<u64>,
}

#[derive(Debug, Clone)]
enum Animation {
    Fling(Fling),
    Tween(Tween),
    ZoomBounce(ZoomBounce),
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    origin: Point,
    last: Point,
    lock: Option<Axis>,
}

#[derive(Debug, Clone, Copy)]
struct Pinch {
    start_scale: f32,
    focus: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    Drag,
    Cancel,
    Fling,
    Settle,
}

#[derive(Debug)]
pub struct ScrollPhysics {
    config: ScrollConfig,
    behavior: ScrollBehavior,
    phase: ScrollPhase,
    offset: Point,
    content_size: Size,
    viewport: Size,
    insets: EdgeInsets,
    zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
    tracker: VelocityTracker,
    drag: Option<Drag>,
    pinch: Option<Pinch>,
    animation: Option<Animation>,
    listeners: ScrollListeners,
}

impl Default for ScrollPhysics {
    fn default() -> Self {
        Self::new(ScrollConfig::default())
    }
}

impl ScrollPhysics {
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            behavior: ScrollBehavior::default(),
            phase: ScrollPhase::Idle,
            offset: Point::ZERO,
            content_size: Size::ZERO,
            viewport: Size::ZERO,
            insets: EdgeInsets::default(),
            zoom: 1.0,
            min_zoom: 1.0,
            max_zoom: 1.0,
            tracker: VelocityTracker::new(),
            drag: None,
            pinch: None,
            animation: None,
            listeners: ScrollListeners::default(),
        }
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ScrollConfig) {
        self.config = config;
    }

    pub fn behavior(&self) -> ScrollBehavior {
        self.behavior
    }

    /// Disabling scrolling mid-gesture cancels the gesture.
    pub fn set_behavior(&mut self, behavior: ScrollBehavior) {
        if !behavior.scroll_enabled && self.behavior.scroll_enabled {
            self.touch_cancel();
            self.pinch_end();
        }
        self.behavior = behavior;
    }

    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    pub fn is_tracking(&self) -> bool {
        self.phase == ScrollPhase::Tracking
    }

    pub fn is_dragging(&self) -> bool {
        self.phase == ScrollPhase::Dragging
    }

    pub fn is_decelerating(&self) -> bool {
        self.phase == ScrollPhase::Decelerating
    }

    pub fn is_zooming(&self) -> bool {
        matches!(self.phase, ScrollPhase::Zooming | ScrollPhase::ZoomBouncing)
    }

    /// Whether [`tick`](Self::tick) still has work to do.
    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn gate(&self) -> GeometryGate {
        match self.phase {
            ScrollPhase::Idle | ScrollPhase::Tracking => GeometryGate::Immediate,
            ScrollPhase::Dragging | ScrollPhase::Decelerating => GeometryGate::RebaseOffset,
            ScrollPhase::Zooming | ScrollPhase::ZoomBouncing => GeometryGate::Defer,
        }
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Unscaled content size.
    pub fn content_size(&self) -> Size {
        self.content_size
    }

    pub fn set_content_size(&mut self, size: Size) {
        self.content_size = size;
        let (min, max) = (self.min_offset(), self.max_offset());
        if let Some(Animation::Fling(fling)) = &mut self.animation {
            for axis in Axis::BOTH {
                if let AxisMotion::Spring(spring) = &mut fling.axes[axis.index()] {
                    spring.target = spring.target.clamp(axis.of(min), axis.of(max));
                }
            }
        }
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport(&mut self, size: Size) {
        self.viewport = size;
    }

    pub fn insets(&self) -> EdgeInsets {
        self.insets
    }

    pub fn set_content_insets(&mut self, insets: EdgeInsets) {
        self.insets = insets;
    }

    pub fn zoom_scale(&self) -> f32 {
        self.zoom
    }

    pub fn zoom_bounds(&self) -> (f32, f32) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn set_zoom_bounds(&mut self, min: f32, max: f32) {
        self.min_zoom = min.max(0.01);
        self.max_zoom = max.max(self.min_zoom);
        if !self.is_zooming() {
            let clamped = self.zoom.clamp(self.min_zoom, self.max_zoom);
            if clamped != self.zoom {
                self.apply_zoom(clamped, self.viewport_center());
            }
        }
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&mut ScrollEvent) + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn min_offset(&self) -> Point {
        Point::new(-self.insets.left, -self.insets.top)
    }

    pub fn max_offset(&self) -> Point {
        self.max_offset_at(self.zoom)
    }

    /// Viewport in unscaled content coordinates.
    pub fn visible_content_rect(&self) -> Rect {
        let inverse = 1.0 / self.zoom;
        Rect::new(
            self.offset.x * inverse,
            self.offset.y * inverse,
            self.viewport.width * inverse,
            self.viewport.height * inverse,
        )
    }

    pub fn clamp_offset(&self, offset: Point) -> Point {
        self.clamp_offset_at(offset, self.zoom)
    }

    pub fn is_out_of_bounds(&self) -> bool {
        self.clamp_offset(self.offset) != self.offset
    }

    pub fn handle(&mut self, event: InputEvent) {
        if !self.behavior.scroll_enabled {
            log::trace!("scrolling disabled; dropping {event:?}");
            return;
        }
        match event {
            InputEvent::Down { position, time_ms } => self.touch_down(position, time_ms),
            InputEvent::Move { position, time_ms } => self.touch_move(position, time_ms),
            InputEvent::Up { position, time_ms } => self.touch_up(position, time_ms),
            InputEvent::Cancel { .. } => {
                self.touch_cancel();
                self.pinch_end();
            }
            InputEvent::PinchBegin { focus, .. } => self.pinch_begin(focus),
            InputEvent::PinchChange { focus, scale, .. } => self.pinch_change(focus, scale),
            InputEvent::PinchEnd { .. } => self.pinch_end(),
        }
    }

    /// Jumps (or animates) to `offset`. The offset is not clamped.
    pub fn set_content_offset(&mut self, offset: Point, animated: bool) {
        self.stop_animation();
        let dragging = matches!(self.phase, ScrollPhase::Tracking | ScrollPhase::Dragging);
        if !animated || dragging || self.config.scroll_animation_ms == 0 {
            self.set_offset(offset);
            return;
        }
        self.start_tween(offset, self.zoom, false);
    }

    /// Scrolls the least distance that brings `rect` (unscaled content
    /// coordinates) into view.
    pub fn scroll_rect_to_visible(&mut self, rect: Rect, animated: bool) {
        let mut target = self.offset;
        for axis in Axis::BOTH {
            let start = axis_origin(axis, rect) * self.zoom;
            let length = axis_length(axis, rect) * self.zoom;
            let view = axis.length(self.viewport);
            let current = axis.of(self.offset);
            let value = if length >= view || start < current {
                start
            } else if start + length > current + view {
                start + length - view
            } else {
                current
            };
            axis.set(&mut target, value);
        }
        let target = self.clamp_offset(target);
        if target != self.offset {
            self.set_content_offset(target, animated);
        }
    }

    /// Animates to the top edge. Returns `false` when scroll-to-top is
    /// disabled.
    pub fn scroll_to_top(&mut self) -> bool {
        if !self.behavior.scrolls_to_top || !self.behavior.scroll_enabled {
            return false;
        }
        self.stop_animation();
        let target = Point::new(self.offset.x, self.min_offset().y);
        self.start_tween(target, self.zoom, true);
        true
    }

    /// Sets the zoom scale (clamped to the bounds), keeping the viewport
    /// center fixed.
    pub fn set_zoom_scale(&mut self, scale: f32, animated: bool) {
        let scale = scale.clamp(self.min_zoom, self.max_zoom);
        let center = self.viewport_center();
        let anchor = (self.offset + center) * (1.0 / self.zoom);
        let target = self.clamp_offset_at(anchor * scale - center, scale);
        self.zoom_to(target, scale, animated);
    }

    /// Zooms so that `rect` (unscaled content coordinates) fills the viewport.
    pub fn zoom_to_rect(&mut self, rect: Rect, animated: bool) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let scale = (self.viewport.width / rect.width)
            .min(self.viewport.height / rect.height)
            .clamp(self.min_zoom, self.max_zoom);
        let center = Point::new(rect.x + rect.width / 2.0, rect.y + rect.height / 2.0);
        let target = self.clamp_offset_at(center * scale - self.viewport_center(), scale);
        self.zoom_to(target, scale, animated);
    }

    /// Starts a fling with `velocity` (px/s) as if a drag had just ended.
    pub fn fling(&mut self, velocity: Point) {
        if matches!(
            self.phase,
            ScrollPhase::Tracking | ScrollPhase::Dragging | ScrollPhase::Zooming | ScrollPhase::ZoomBouncing
        ) {
            return;
        }
        self.stop_animation();
        self.release(velocity, Release::Fling);
    }

    /// Brings the offset back within bounds after the content shrank.
    ///
    /// An idle or tracking offset is clamped on the spot and a scroll
    /// animation is retargeted to the nearest valid offset. Fling axes that
    /// stand still out of bounds bounce back; decays heading to rest out of
    /// bounds are turned around on the next frame. Drags and pinches are left
    /// alone, since their release settles them.
    pub fn constrain(&mut self) {
        if matches!(
            self.phase,
            ScrollPhase::Dragging | ScrollPhase::Zooming | ScrollPhase::ZoomBouncing
        ) {
            return;
        }
        let (min, max) = (self.min_offset(), self.max_offset());
        match self.animation.take() {
            Some(Animation::Fling(mut fling)) => {
                let mut offset = self.offset;
                for axis in Axis::BOTH {
                    let value = axis.of(self.offset);
                    let (lo, hi) = (axis.of(min), axis.of(max));
                    let slot = &mut fling.axes[axis.index()];
                    if matches!(slot, AxisMotion::Idle) && (value < lo || value > hi) {
                        let (motion, shown) = self.return_motion(axis, value, 0.0, lo, hi);
                        *slot = motion;
                        axis.set(&mut offset, shown);
                    }
                }
                self.animation = Some(Animation::Fling(fling));
                self.set_offset(offset);
            }
            Some(Animation::Tween(mut tween)) => {
                tween.to = self.clamp_offset_at(tween.to, tween.to_scale);
                self.animation = Some(Animation::Tween(tween));
            }
            Some(other) => self.animation = Some(other),
            None => {
                let clamped = self.clamp_offset(self.offset);
                if clamped != self.offset {
                    log::debug!("content shrank; clamping offset {:?} -> {clamped:?}", self.offset);
                    self.set_offset(clamped);
                }
            }
        }
    }

    /// Shifts the offset, and the motion in flight, by `delta` after content
    /// above the viewport changed length.
    pub fn rebase_offset(&mut self, delta: Point) {
        if delta == Point::ZERO {
            return;
        }
        match &mut self.animation {
            Some(Animation::Fling(fling)) => {
                for axis in Axis::BOTH {
                    let shift = axis.of(delta);
                    match &mut fling.axes[axis.index()] {
                        AxisMotion::Decay(decay) => decay.shift(shift),
                        AxisMotion::Spring(spring) => spring.shift(shift),
                        AxisMotion::Idle => {}
                    }
                }
            }
            Some(Animation::Tween(tween)) => {
                tween.from += delta;
                tween.to += delta;
            }
            Some(Animation::ZoomBounce(_)) | None => {}
        }
        log::trace!("rebasing offset by {delta:?}");
        self.set_offset(self.offset + delta);
    }

    /// Advances the animation to `frame_nanos`. Returns whether another frame
    /// is needed.
    pub fn tick(&mut self, frame_nanos: u64) -> bool {
        let Some(mut animation) = self.animation.take() else {
            return false;
        };
        let finished = match &mut animation {
            Animation::Fling(fling) => self.step_fling(fling, frame_nanos),
            Animation::Tween(tween) => self.step_tween(tween, frame_nanos),
            Animation::ZoomBounce(bounce) => self.step_zoom_bounce(bounce, frame_nanos),
        };
        if finished {
            self.finish(animation);
        } else {
            self.animation = Some(animation);
        }
        self.animation.is_some()
    }

    fn touch_down(&mut self, position: Point, time_ms: i64) {
        if self.phase == ScrollPhase::Zooming {
            return;
        }
        self.stop_animation();
        self.tracker.reset();
        self.tracker.add(time_ms, position);
        self.drag = Some(Drag {
            origin: position,
            last: position,
            lock: None,
        });
        self.set_phase(ScrollPhase::Tracking);
    }

    fn touch_move(&mut self, position: Point, time_ms: i64) {
        let Some(mut drag) = self.drag else {
            return;
        };
        self.tracker.add(time_ms, position);
        match self.phase {
            ScrollPhase::Tracking => {
                let travel = position - drag.origin;
                if travel.length() < self.config.slop {
                    return;
                }
                drag.lock = self.directional_lock_for(travel);
                drag.last = position;
                self.drag = Some(drag);
                self.set_phase(ScrollPhase::Dragging);
                self.emit(ScrollEvent::WillBeginDragging { offset: self.offset });
            }
            ScrollPhase::Dragging => {
                // Content follows the finger: moving up scrolls down.
                let delta = drag.last - position;
                drag.last = position;
                self.drag = Some(drag);
                let next = self.dragged_offset(delta, drag.lock);
                self.set_offset(next);
            }
            _ => {}
        }
    }

    fn touch_up(&mut self, position: Point, time_ms: i64) {
        let drag = self.drag.take();
        match self.phase {
            ScrollPhase::Tracking => self.set_phase(ScrollPhase::Idle),
            ScrollPhase::Dragging => {
                self.tracker.add(time_ms, position);
                let finger = self.tracker.velocity(self.config.max_fling_velocity);
                let velocity = self.release_velocity(-finger, drag.and_then(|drag| drag.lock));
                self.release(velocity, Release::Drag);
            }
            _ => {}
        }
    }

    fn touch_cancel(&mut self) {
        self.drag = None;
        match self.phase {
            ScrollPhase::Tracking => self.set_phase(ScrollPhase::Idle),
            ScrollPhase::Dragging => self.release(Point::ZERO, Release::Cancel),
            _ => {}
        }
    }

    fn pinch_begin(&mut self, focus: Point) {
        if self.phase == ScrollPhase::Dragging {
            self.emit(ScrollEvent::DidEndDragging { will_decelerate: false });
        }
        self.drag = None;
        self.stop_animation();
        self.pinch = Some(Pinch {
            start_scale: self.zoom,
            focus,
        });
        self.set_phase(ScrollPhase::Zooming);
        self.emit(ScrollEvent::WillBeginZooming);
    }

    fn pinch_change(&mut self, focus: Point, factor: f32) {
        let Some(mut pinch) = self.pinch else {
            return;
        };
        if self.phase != ScrollPhase::Zooming || !factor.is_finite() {
            return;
        }
        let raw = pinch.start_scale * factor;
        let scale = if raw >= self.min_zoom && raw <= self.max_zoom {
            raw
        } else if self.behavior.bounces_zoom {
            self.config.rubber_band.apply_scale(raw, self.min_zoom, self.max_zoom)
        } else {
            raw.clamp(self.min_zoom, self.max_zoom)
        };
        pinch.focus = focus;
        self.pinch = Some(pinch);
        self.apply_zoom(scale, focus);
    }

    fn pinch_end(&mut self) {
        let Some(pinch) = self.pinch.take() else {
            return;
        };
        if self.phase != ScrollPhase::Zooming {
            return;
        }
        let bound = self.zoom.clamp(self.min_zoom, self.max_zoom);
        if bound != self.zoom {
            self.set_phase(ScrollPhase::ZoomBouncing);
            self.animation = Some(Animation::ZoomBounce(ZoomBounce {
                spring: SpringMotion::new(self.config.zoom_bounce_spring, self.zoom, 0.0, bound),
                focus: pinch.focus,
                last_nanos: None,
            }));
        } else {
            self.finish_zoom();
        }
    }

    fn finish_zoom(&mut self) {
        self.set_phase(ScrollPhase::Idle);
        self.emit(ScrollEvent::DidEndZooming { scale: self.zoom });
        self.release(Point::ZERO, Release::Settle);
    }

    /// Ends a drag, cancel, programmatic fling or zoom with `velocity`.
    fn release(&mut self, velocity: Point, kind: Release) {
        let rate = self.config.deceleration_rate;
        let (min, max) = (self.min_offset(), self.max_offset());
        let projected = Point::new(
            self.offset.x + rate.projected_distance(velocity.x),
            self.offset.y + rate.projected_distance(velocity.y),
        );
        let proposed = if self.behavior.paging {
            self.page_target(projected)
        } else {
            self.clamp_offset(projected)
        };

        let mut chosen = proposed;
        if kind == Release::Drag {
            if let ScrollEvent::WillEndDragging { target, .. } =
                self.emit(ScrollEvent::WillEndDragging { velocity, target: proposed })
            {
                chosen = target;
            }
        }
        let targeted = self.behavior.paging || chosen != proposed;
        let chosen = self.clamp_offset(chosen);

        let mut axes = [AxisMotion::Idle; 2];
        let mut settled = self.offset;
        for axis in Axis::BOTH {
            let current = axis.of(self.offset);
            let (lo, hi) = (axis.of(min), axis.of(max));
            let speed = axis.of(velocity);
            let motion = if targeted && kind != Release::Settle {
                let target = axis.of(chosen);
                if (target - current).abs() < SETTLE_DISTANCE {
                    axis.set(&mut settled, target);
                    AxisMotion::Idle
                } else {
                    AxisMotion::Decay(DecayMotion::toward(current, target, rate))
                }
            } else if current < lo || current > hi {
                let (motion, shown) = self.return_motion(axis, current, speed, lo, hi);
                axis.set(&mut settled, shown);
                motion
            } else if speed != 0.0 {
                AxisMotion::Decay(DecayMotion::new(current, speed, rate))
            } else {
                AxisMotion::Idle
            };
            axes[axis.index()] = motion;
        }
        self.set_offset(settled);

        let will_decelerate = axes.iter().any(|motion| !matches!(motion, AxisMotion::Idle));
        if matches!(kind, Release::Drag | Release::Cancel) {
            self.emit(ScrollEvent::DidEndDragging { will_decelerate });
        }
        if will_decelerate {
            self.set_phase(ScrollPhase::Decelerating);
            self.emit(ScrollEvent::WillBeginDecelerating);
            self.animation = Some(Animation::Fling(Fling {
                axes,
                start_nanos: None,
                last_nanos: None,
            }));
        } else {
            self.set_phase(ScrollPhase::Idle);
        }
    }

    fn step_fling(&mut self, fling: &mut Fling, now: u64) -> bool {
        let start = *fling.start_nanos.get_or_insert(now);
        let dt = fling
            .last_nanos
            .map_or(0.0, |last| now.saturating_sub(last) as f32 / 1e9)
            .min(MAX_FRAME_STEP);
        fling.last_nanos = Some(now);
        let elapsed_ms = now.saturating_sub(start) as f32 / 1e6;

        let (min, max) = (self.min_offset(), self.max_offset());
        let mut offset = self.offset;
        for axis in Axis::BOTH {
            let (lo, hi) = (axis.of(min), axis.of(max));
            let slot = &mut fling.axes[axis.index()];
            let value = match slot {
                AxisMotion::Idle => continue,
                AxisMotion::Decay(decay) => {
                    let value = decay.value_at(elapsed_ms);
                    let speed = decay.velocity_at(elapsed_ms);
                    let target = decay.target();
                    // Out of bounds and not coming back on its own: either
                    // still heading out, or content shrank under the fling.
                    let stranded = (value < lo && (speed < 0.0 || target < lo))
                        || (value > hi && (speed > 0.0 || target > hi));
                    if stranded {
                        let (motion, shown) = self.return_motion(axis, value, speed, lo, hi);
                        *slot = motion;
                        shown
                    } else if (target - value).abs() < SETTLE_DISTANCE {
                        *slot = AxisMotion::Idle;
                        target
                    } else {
                        value
                    }
                }
                AxisMotion::Spring(spring) => {
                    spring.advance(dt);
                    if spring.is_settled() {
                        spring.settle();
                        let target = spring.target;
                        *slot = AxisMotion::Idle;
                        target
                    } else {
                        spring.position
                    }
                }
            };
            axis.set(&mut offset, value);
        }
        self.set_offset(offset);
        fling.axes.iter().all(|motion| matches!(motion, AxisMotion::Idle))
    }

    fn step_tween(&mut self, tween: &mut Tween, now: u64) -> bool {
        let start = *tween.start_nanos.get_or_insert(now);
        let elapsed_ms = now.saturating_sub(start) as f32 / 1e6;
        let progress = if tween.duration_ms == 0 {
            1.0
        } else {
            (elapsed_ms / tween.duration_ms as f32).min(1.0)
        };
        let eased = self.config.scroll_easing.transform(progress);
        let scale = tween.from_scale + (tween.to_scale - tween.from_scale) * eased;
        let offset = tween.from + (tween.to - tween.from) * eased;
        let (scale, offset) = if progress >= 1.0 {
            (tween.to_scale, tween.to)
        } else {
            (scale, offset)
        };
        if scale != self.zoom {
            self.zoom = scale;
            self.emit(ScrollEvent::DidZoom { scale });
        }
        self.set_offset(offset);
        progress >= 1.0
    }

    fn step_zoom_bounce(&mut self, bounce: &mut ZoomBounce, now: u64) -> bool {
        let dt = bounce
            .last_nanos
            .map_or(0.0, |last| now.saturating_sub(last) as f32 / 1e9)
            .min(MAX_FRAME_STEP);
        bounce.last_nanos = Some(now);
        bounce.spring.advance(dt);
        let settled = bounce.spring.is_settled();
        if settled {
            bounce.spring.settle();
        }
        self.apply_zoom(bounce.spring.position, bounce.focus);
        settled
    }

    fn finish(&mut self, animation: Animation) {
        match animation {
            Animation::Fling(_) => {
                self.set_phase(ScrollPhase::Idle);
                self.emit(ScrollEvent::DidEndDecelerating { offset: self.offset });
            }
            Animation::Tween(tween) => {
                self.emit(ScrollEvent::DidEndScrollingAnimation { offset: self.offset });
                if tween.to_top {
                    self.emit(ScrollEvent::DidScrollToTop);
                }
            }
            Animation::ZoomBounce(_) => self.finish_zoom(),
        }
    }

    /// Stops the animation in flight where it stands and publishes its end.
    fn stop_animation(&mut self) {
        let Some(animation) = self.animation.take() else {
            return;
        };
        log::trace!("stopping animation at {:?}", self.offset);
        match animation {
            Animation::Fling(_) => {
                self.set_phase(ScrollPhase::Idle);
                self.emit(ScrollEvent::DidEndDecelerating { offset: self.offset });
            }
            Animation::Tween(_) => {
                self.emit(ScrollEvent::DidEndScrollingAnimation { offset: self.offset });
            }
            Animation::ZoomBounce(bounce) => {
                self.apply_zoom(bounce.spring.target, bounce.focus);
                self.set_phase(ScrollPhase::Idle);
                self.emit(ScrollEvent::DidEndZooming { scale: self.zoom });
            }
        }
    }

    fn zoom_to(&mut self, offset: Point, scale: f32, animated: bool) {
        self.stop_animation();
        if !animated || self.config.scroll_animation_ms == 0 {
            if scale != self.zoom {
                self.zoom = scale;
                self.emit(ScrollEvent::DidZoom { scale });
            }
            self.set_offset(offset);
            return;
        }
        self.animation = Some(Animation::Tween(Tween {
            from: self.offset,
            to: offset,
            from_scale: self.zoom,
            to_scale: scale,
            duration_ms: self.config.scroll_animation_ms,
            start_nanos: None,
            to_top: false,
        }));
    }

    fn start_tween(&mut self, to: Point, scale: f32, to_top: bool) {
        self.animation = Some(Animation::Tween(Tween {
            from: self.offset,
            to,
            from_scale: self.zoom,
            to_scale: scale,
            duration_ms: self.config.scroll_animation_ms,
            start_nanos: None,
            to_top,
        }));
    }

    /// Rescales around `focus` (viewport coordinates) so the content point
    /// under it stays put.
    fn apply_zoom(&mut self, scale: f32, focus: Point) {
        let scale = scale.max(f32::EPSILON);
        let anchor = (self.offset + focus) * (1.0 / self.zoom);
        self.zoom = scale;
        let mut offset = anchor * scale - focus;
        if !self.behavior.bounces {
            offset = self.clamp_offset(offset);
        }
        self.emit(ScrollEvent::DidZoom { scale });
        self.set_offset(offset);
    }

    /// Motion that brings `value` back into `[lo, hi]`, plus the value to
    /// show right now. Axes that do not bounce snap to the bound.
    fn return_motion(&self, axis: Axis, value: f32, speed: f32, lo: f32, hi: f32) -> (AxisMotion, f32) {
        let bound = value.clamp(lo, hi);
        if self.axis_bounces(axis) {
            let spring = SpringMotion::new(self.config.bounce_spring, value, speed, bound);
            (AxisMotion::Spring(spring), value)
        } else {
            (AxisMotion::Idle, bound)
        }
    }

    fn dragged_offset(&self, delta: Point, lock: Option<Axis>) -> Point {
        let (min, max) = (self.min_offset(), self.max_offset());
        let mut next = self.offset;
        for axis in Axis::BOTH {
            if lock.is_some_and(|locked| locked != axis) || !self.axis_scrollable(axis) {
                continue;
            }
            let current = axis.of(self.offset);
            let step = axis.of(delta);
            let (lo, hi) = (axis.of(min), axis.of(max));
            let value = if self.axis_bounces(axis) {
                self.config
                    .rubber_band
                    .apply(current, step, lo, hi, axis.length(self.viewport))
            } else {
                (current + step).clamp(lo, hi)
            };
            axis.set(&mut next, value);
        }
        next
    }

    fn release_velocity(&self, velocity: Point, lock: Option<Axis>) -> Point {
        let mut result = Point::ZERO;
        for axis in Axis::BOTH {
            let speed = axis.of(velocity);
            let usable = lock.map_or(true, |locked| locked == axis)
                && self.axis_scrollable(axis)
                && speed.abs() >= self.config.min_fling_velocity;
            if usable {
                axis.set(&mut result, speed);
            }
        }
        result
    }

    fn directional_lock_for(&self, travel: Point) -> Option<Axis> {
        if !self.behavior.directional_lock {
            return None;
        }
        let (dx, dy) = (travel.x.abs(), travel.y.abs());
        let ratio = self.config.directional_lock_ratio;
        if dy >= dx * ratio {
            Some(Axis::Vertical)
        } else if dx >= dy * ratio {
            Some(Axis::Horizontal)
        } else {
            None
        }
    }

    fn page_target(&self, projected: Point) -> Point {
        let page = self.config.page_size.unwrap_or(self.viewport);
        let min = self.min_offset();
        let mut target = projected;
        for axis in Axis::BOTH {
            let length = axis.length(page);
            if length > 0.0 {
                let lo = axis.of(min);
                let pages = ((axis.of(projected) - lo) / length).round();
                axis.set(&mut target, lo + pages * length);
            }
        }
        self.clamp_offset(target)
    }

    fn axis_scrollable(&self, axis: Axis) -> bool {
        let always = match axis {
            Axis::Horizontal => self.behavior.always_bounce_horizontal,
            Axis::Vertical => self.behavior.always_bounce_vertical,
        };
        always || axis.of(self.max_offset()) > axis.of(self.min_offset())
    }

    fn axis_bounces(&self, axis: Axis) -> bool {
        self.behavior.bounces && self.axis_scrollable(axis)
    }

    fn max_offset_at(&self, scale: f32) -> Point {
        let content = self.content_size.scale(scale);
        let min = self.min_offset();
        Point::new(
            (content.width + self.insets.right - self.viewport.width).max(min.x),
            (content.height + self.insets.bottom - self.viewport.height).max(min.y),
        )
    }

    fn clamp_offset_at(&self, offset: Point, scale: f32) -> Point {
        let (min, max) = (self.min_offset(), self.max_offset_at(scale));
        Point::new(offset.x.clamp(min.x, max.x), offset.y.clamp(min.y, max.y))
    }

    fn viewport_center(&self) -> Point {
        Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    fn set_offset(&mut self, offset: Point) {
        if offset == self.offset {
            return;
        }
        log::trace!("offset {:?} -> {:?}", self.offset, offset);
        self.offset = offset;
        self.emit(ScrollEvent::DidScroll { offset });
    }

    fn set_phase(&mut self, phase: ScrollPhase) {
        if phase != self.phase {
            log::debug!("scroll phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    fn emit(&mut self, event: ScrollEvent) -> ScrollEvent {
        self.listeners.emit(event)
    }
}

fn axis_origin(axis: Axis, rect: Rect) -> f32 {
    match axis {
        Axis::Horizontal => rect.x,
        Axis::Vertical => rect.y,
    }
}

fn axis_length(axis: Axis, rect: Rect) -> f32 {
    match axis {
        Axis::Horizontal => rect.width,
        Axis::Vertical => rect.height,
    }
}

#[cfg(test)]
#[path = "tests/scroll_tests.rs"]
mod tests;
