//! Immutable per-frame view of the engine state.
//!
//! The renderer only ever sees a [`FrameSnapshot`]; pixel surfaces are
//! shared through `Arc`, so taking a snapshot never copies pixels and the
//! engine can keep mutating its own copies (copy-on-write) afterwards.

use crate::color::SerializableColor;
use crate::coords::{ImagePoint, PixelRect};
use crate::polygon::{PointMarker, Polygon};
use crate::stroke::Stroke;
use kurbo::Vec2;
use std::sync::Arc;
use tiny_skia::Pixmap;

/// Where the spotlight reads mask membership from.
#[derive(Debug, Clone)]
pub enum SpotlightSource {
    /// The raster mask surface (authoritative when non-empty).
    Raster(Arc<Pixmap>),
    /// Polygons, rasterized by the renderer.
    Polygons(Vec<Polygon>),
}

/// Tool-specific overlay.
#[derive(Debug, Clone, Default)]
pub enum ToolOverlay {
    #[default]
    None,
    DragVector {
        start: ImagePoint,
        end: ImagePoint,
    },
    FloatingSelection {
        hole: Arc<Pixmap>,
        pixels: Arc<Pixmap>,
        bounds: PixelRect,
        offset: Vec2,
    },
}

/// Raster-brush presentation: dark overlay with the mask punched out and
/// a cursor ring.
#[derive(Debug, Clone)]
pub struct RasterBrushView {
    pub mask: Arc<Pixmap>,
    pub cursor: Option<ImagePoint>,
    /// Brush diameter in image pixels.
    pub size: f64,
}

#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// Processed image if available, otherwise the raw image.
    pub base: Arc<Pixmap>,
    pub spotlight: Option<SpotlightSource>,
    /// Committed strokes passing the current quill filter.
    pub strokes: Vec<Stroke>,
    pub current_stroke: Option<Stroke>,
    pub points: Vec<PointMarker>,
    pub overlay: ToolOverlay,
    pub raster_brush: Option<RasterBrushView>,
    pub pen_color: SerializableColor,
}

impl FrameSnapshot {
    pub fn width(&self) -> u32 {
        self.base.width()
    }

    pub fn height(&self) -> u32 {
        self.base.height()
    }
}
