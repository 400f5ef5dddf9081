// Viewport Controller
//
// Zoom transform applied to the whole map as one group. Only the scroll
// wheel changes it, and the scale is clamped to a configured range.

/// d3-style wheel sensitivity: scale *= 2^(-delta_y * WHEEL_FACTOR)
pub const WHEEL_FACTOR: f64 = 0.002;

/// Affine display transform: screen = world * scale + translate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
}

impl ViewportTransform {
    pub const IDENTITY: Self = Self {
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
    };

    pub fn apply(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            x * self.scale + self.translate_x,
            y * self.scale + self.translate_y,
        )
    }

    pub fn invert(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            (x - self.translate_x) / self.scale,
            (y - self.translate_y) / self.scale,
        )
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    transform: ViewportTransform,
    min_scale: f64,
    max_scale: f64,
}

impl ViewportController {
    /// Bounds are reordered if given reversed
    pub fn new(min_scale: f64, max_scale: f64) -> Self {
        let (min_scale, max_scale) = if min_scale <= max_scale {
            (min_scale, max_scale)
        } else {
            (max_scale, min_scale)
        };
        Self {
            transform: ViewportTransform {
                scale: 1.0_f64.clamp(min_scale, max_scale),
                ..ViewportTransform::IDENTITY
            },
            min_scale,
            max_scale,
        }
    }

    pub fn transform(&self) -> ViewportTransform {
        self.transform
    }

    #[cfg(test)]
    pub fn scale_bounds(&self) -> (f64, f64) {
        (self.min_scale, self.max_scale)
    }

    /// Zoom by a wheel delta, keeping `anchor` (screen space) fixed
    ///
    /// Positive `delta_y` zooms out, negative zooms in.
    pub fn on_wheel(&mut self, delta_y: f64, anchor: (f64, f64)) {
        if !delta_y.is_finite() {
            return;
        }
        let old = self.transform;
        let factor = 2f64.powf(-delta_y * WHEEL_FACTOR);
        let scale = (old.scale * factor).clamp(self.min_scale, self.max_scale);
        if scale == old.scale {
            return;
        }

        let world = old.invert(anchor);
        self.transform = ViewportTransform {
            translate_x: anchor.0 - world.0 * scale,
            translate_y: anchor.1 - world.1 * scale,
            scale,
        };
    }

    pub fn reset(&mut self) {
        self.transform = ViewportTransform {
            scale: 1.0_f64.clamp(self.min_scale, self.max_scale),
            ..ViewportTransform::IDENTITY
        };
    }
}
