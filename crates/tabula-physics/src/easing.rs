//! Timing curves for programmatic scroll and zoom animations.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    EaseInOut,
    EaseOut,
    FastOutSlowIn,
}

impl Easing {
    /// Maps linear progress in `[0, 1]` onto the curve.
    pub fn transform(self, fraction: f32) -> f32 {
        match self {
            Easing::Linear => fraction.clamp(0.0, 1.0),
            Easing::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, fraction),
            Easing::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, fraction),
            Easing::FastOutSlowIn => cubic_bezier(0.4, 0.0, 0.2, 1.0, fraction),
        }
    }
}

fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, fraction: f32) -> f32 {
    if fraction <= 0.0 {
        return 0.0;
    }
    if fraction >= 1.0 {
        return 1.0;
    }
    let coefficients = |p1: f32, p2: f32| {
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        (1.0 - c - b, b, c)
    };
    let (ax, bx, cx) = coefficients(x1, x2);
    let (ay, by, cy) = coefficients(y1, y2);
    let curve = |a: f32, b: f32, c: f32, t: f32| ((a * t + b) * t + c) * t;

    // Solve x(t) = fraction by bisection; x is monotonic for these curves.
    let (mut low, mut high) = (0.0f32, 1.0f32);
    let mut t = fraction;
    for _ in 0..24 {
        let x = curve(ax, bx, cx, t);
        if (x - fraction).abs() < 1e-6 {
            break;
        }
        if x > fraction {
            high = t;
        } else {
            low = t;
        }
        t = 0.5 * (low + high);
    }
    curve(ay, by, cy, t)
}
