//! Diminishing response to pulls past the content bounds.

/// Resistance applied to drags beyond the bounds.
///
/// The share of a finger movement that reaches the offset starts at
/// `resistance` and falls linearly to `min_resistance` as the overscroll
/// approaches `max_stretch` (a fraction of the viewport length).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RubberBand {
    pub resistance: f32,
    pub min_resistance: f32,
    pub max_stretch: f32,
    /// Exponent applied to zoom scales past their bounds.
    pub zoom_resistance: f32,
}

impl Default for RubberBand {
    fn default() -> Self {
        Self {
            resistance: 0.55,
            min_resistance: 0.10,
            max_stretch: 0.5,
            zoom_resistance: 0.4,
        }
    }
}

impl RubberBand {
    /// Applies `delta` to `current`, resisting the part beyond `[lo, hi]`.
    /// `viewport` is the viewport length along the same axis.
    pub fn apply(&self, current: f32, delta: f32, lo: f32, hi: f32, viewport: f32) -> f32 {
        let limit = (viewport * self.max_stretch).max(1.0);
        let proposed = current + delta;

        // Part of the movement that stays inside (or returns inside) is free.
        let (anchor, excess) = if delta > 0.0 && proposed > hi {
            let start = current.max(hi);
            (start, proposed - start)
        } else if delta < 0.0 && proposed < lo {
            let start = current.min(lo);
            (start, proposed - start)
        } else {
            return proposed;
        };

        let overscroll = if anchor > hi { anchor - hi } else { lo - anchor };
        let stretch = (overscroll.max(0.0) / limit).min(1.0);
        let share = self.resistance - stretch * (self.resistance - self.min_resistance);
        let moved = anchor + excess * share;
        moved.clamp(lo - limit, hi + limit)
    }

    /// Damps a zoom scale beyond `[min, max]`.
    pub fn apply_scale(&self, scale: f32, min: f32, max: f32) -> f32 {
        if scale > max {
            max * (scale / max).powf(self.zoom_resistance)
        } else if scale < min && scale > 0.0 {
            min * (scale / min).powf(self.zoom_resistance)
        } else if scale <= 0.0 {
            min * 0.5f32.powf(self.zoom_resistance)
        } else {
            scale
        }
    }
}
