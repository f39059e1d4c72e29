//! View transform for two-pointer pan/zoom.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// One incremental two-pointer update, relative to the previous sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchStep {
    /// Centroid of the two pointers, relative to the surface container.
    pub center: Point,
    /// Ratio of the current inter-pointer distance to the previous one.
    pub scale_factor: f64,
    /// Centroid movement since the previous sample.
    pub delta: Vec2,
}

/// Pan/zoom applied to the rendering surface's container.
///
/// Never zooms below native scale and never lets the image leave the
/// container: at scale `s` the translation stays in `[size * (1 - s), 0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// Current translation (pan)
    pub translate: Vec2,
    /// Current zoom level (1.0 = native)
    pub scale: f64,
    /// Maximum allowed zoom level
    pub max_scale: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: 1.0,
            max_scale: 8.0,
        }
    }
}

impl ViewTransform {
    pub fn new(max_scale: f64) -> Self {
        Self {
            max_scale: max_scale.max(1.0),
            ..Self::default()
        }
    }

    /// Container-local to on-screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.translate) * Affine::scale(self.scale)
    }

    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.translate)
    }

    /// Where the container's box ends up after the transform.
    pub fn transformed_box(&self, bounds: Rect) -> Rect {
        let origin = bounds.origin().to_vec2();
        let local = Rect::from_origin_size(Point::ZERO, bounds.size());
        self.transform().transform_rect_bbox(local) + origin
    }

    pub fn is_identity(&self) -> bool {
        (self.scale - 1.0).abs() < f64::EPSILON && self.translate == Vec2::ZERO
    }

    pub fn reset(&mut self) {
        self.translate = Vec2::ZERO;
        self.scale = 1.0;
    }

    /// Zoom toward the pinch centroid and pan by the centroid delta.
    pub fn apply_pinch(&mut self, step: PinchStep, viewport: Size) {
        if !step.scale_factor.is_finite() || step.scale_factor <= 0.0 {
            return;
        }
        let new_scale = (self.scale * step.scale_factor).clamp(1.0, self.max_scale);
        let effective = new_scale / self.scale;

        let x = step.center.x * (1.0 - effective) + self.translate.x * effective + step.delta.x;
        let y = step.center.y * (1.0 - effective) + self.translate.y * effective + step.delta.y;

        self.scale = new_scale;
        self.translate = Vec2::new(
            clamp_pan(x, viewport.width, new_scale),
            clamp_pan(y, viewport.height, new_scale),
        );
    }
}

fn clamp_pan(value: f64, extent: f64, scale: f64) -> f64 {
    let min = (extent * (1.0 - scale)).min(0.0);
    value.clamp(min, 0.0)
}
