//! Floating selection for the move tool.
//!
//! Lifecycle: `Initialized -> Dragging -> resolved (consumed)`. The
//! selection never writes back into the mask or the base image; the real
//! edit is produced externally from the reported drag end points.

use crate::coords::{ImagePoint, PixelRect};
use crate::error::{EngineError, EngineResult};
use crate::image_buffer::ImageBuffer;
use crate::mask::{MaskSurface, flatten_onto};
use crate::raster;
use kurbo::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tiny_skia::{ColorU8, Pixmap, PremultipliedColorU8};

/// Handle/target pair reported when a move or drag gesture completes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragEnd {
    pub start: ImagePoint,
    pub end: ImagePoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Initialized,
    Dragging,
}

#[derive(Debug, Clone)]
pub struct FloatingSelection {
    /// Base-image pixels under the mask, bounding-box sized, transparent
    /// outside the mask.
    pixels: Arc<Pixmap>,
    /// Flat neutral fill over the in-mask pixels, bounding-box sized.
    hole: Arc<Pixmap>,
    bounds: PixelRect,
    offset: Vec2,
    /// Offset when the current grab started.
    grab_offset: Vec2,
    phase: SelectionPhase,
}

impl FloatingSelection {
    /// Extract the pixels of `image` selected by `mask`.
    ///
    /// A pixel is extracted when the mask, flattened onto black, has a red
    /// level above `threshold`, and greyed out in the hole when it is above
    /// `hole_threshold`. Fails with [`EngineError::EmptySelection`] when
    /// neither test selects anything.
    pub fn extract(
        mask: &MaskSurface,
        image: &ImageBuffer,
        threshold: u8,
        hole_threshold: u8,
        hole_gray: u8,
    ) -> EngineResult<Self> {
        let (w, h) = (image.width(), image.height());
        let flat = flatten_onto(
            &raster::resize_rgba(&mask.to_rgba_image(), w, h),
            [0, 0, 0],
        );
        let level = |x: u32, y: u32| flat.get_pixel(x, y).0[0];
        let selected = |x: u32, y: u32| level(x, y) > threshold;
        let in_hole = |x: u32, y: u32| level(x, y) > hole_threshold;
        let floor = threshold.min(hole_threshold);

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0u32, 0u32);
        for (x, y, _) in flat.enumerate_pixels() {
            if level(x, y) > floor {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
        if min_x == u32::MAX {
            return Err(EngineError::EmptySelection);
        }
        let bounds = PixelRect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1);

        let mut pixels = raster::new_pixmap(bounds.width, bounds.height)?;
        let mut hole = raster::new_pixmap(bounds.width, bounds.height)?;
        let gray = ColorU8::from_rgba(hole_gray, hole_gray, hole_gray, 255).premultiply();
        let clear = PremultipliedColorU8::TRANSPARENT;
        let source = image.as_pixmap();

        for y in 0..bounds.height {
            for x in 0..bounds.width {
                let (sx, sy) = (bounds.x + x, bounds.y + y);
                let i = (y * bounds.width + x) as usize;
                if selected(sx, sy) {
                    pixels.pixels_mut()[i] = source.pixel(sx, sy).unwrap_or(clear);
                }
                if in_hole(sx, sy) {
                    hole.pixels_mut()[i] = gray;
                }
            }
        }

        log::debug!(
            "floating selection {}x{} at ({}, {})",
            bounds.width,
            bounds.height,
            bounds.x,
            bounds.y
        );
        Ok(Self {
            pixels: Arc::new(pixels),
            hole: Arc::new(hole),
            bounds,
            offset: Vec2::ZERO,
            grab_offset: Vec2::ZERO,
            phase: SelectionPhase::Initialized,
        })
    }

    pub fn bounds(&self) -> PixelRect {
        self.bounds
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn pixels(&self) -> Arc<Pixmap> {
        Arc::clone(&self.pixels)
    }

    pub fn hole(&self) -> Arc<Pixmap> {
        Arc::clone(&self.hole)
    }

    /// Whether `point` lies inside the translated bounding box.
    pub fn contains(&self, point: ImagePoint) -> bool {
        self.bounds.contains_offset(point, self.offset)
    }

    pub fn begin_drag(&mut self) {
        self.grab_offset = self.offset;
        self.phase = SelectionPhase::Dragging;
    }

    /// Accumulate an image-space translation.
    pub fn drag_by(&mut self, delta: Vec2) {
        if self.phase == SelectionPhase::Dragging {
            self.offset += delta;
        }
    }

    /// Undo the current grab.
    pub fn cancel_drag(&mut self) {
        self.offset = self.grab_offset;
        self.phase = SelectionPhase::Initialized;
    }

    /// Consume the selection, reporting the bounding-box center before and
    /// after the current grab.
    pub fn resolve(self) -> DragEnd {
        let center = self.bounds.center();
        DragEnd {
            start: center + self.grab_offset,
            end: center + self.offset,
        }
    }
}
