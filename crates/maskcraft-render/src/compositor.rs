//! CPU frame compositor backed by tiny-skia.

use crate::renderer::{RenderContext, RenderError, RenderResult, RenderStyle, Renderer};
use kurbo::Vec2;
use maskcraft_core::{
    FrameSnapshot, ImagePoint, PixelRect, PointLabel, PointMarker, Polygon, RasterBrushView,
    SerializableColor, SpotlightSource, Stroke, ToolOverlay, raster,
};
use peniko::Color;
use std::sync::Arc;
use tiny_skia::{
    BlendMode, ColorU8, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint,
    PixmapRef, Stroke as SkStroke, Transform,
};

/// A rendered frame (premultiplied RGBA at image resolution).
#[derive(Debug, Clone)]
pub struct FrameImage {
    pixmap: Pixmap,
}

impl FrameImage {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight-alpha color of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<ColorU8> {
        raster::pixel_at(&self.pixmap, x, y)
    }

    pub fn as_pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Encode as PNG with straight alpha.
    pub fn to_png(&self) -> RenderResult<Vec<u8>> {
        raster::encode_pixmap_png(&self.pixmap).map_err(|e| RenderError::Encode(e.to_string()))
    }
}

/// Polygon membership raster kept between frames.
struct PolygonRaster {
    polygons: Vec<Polygon>,
    pixmap: Pixmap,
}

/// Composites a [`FrameSnapshot`] back to front:
/// base, spotlight, quill strokes, point markers, tool overlay, raster brush.
#[derive(Default)]
pub struct PixmapRenderer {
    /// Rasterizing polygons is only redone when they change.
    polygon_cache: Option<PolygonRaster>,
}

impl PixmapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn polygon_mask(&mut self, polygons: &[Polygon], width: u32, height: u32) -> RenderResult<&Pixmap> {
        let stale = self.polygon_cache.as_ref().is_none_or(|cache| {
            cache.polygons != polygons
                || cache.pixmap.width() != width
                || cache.pixmap.height() != height
        });
        if stale {
            log::debug!("rasterizing {} polygon(s) for spotlight", polygons.len());
            self.polygon_cache = Some(PolygonRaster {
                polygons: polygons.to_vec(),
                pixmap: rasterize_polygons(polygons, width, height)?,
            });
        }
        match self.polygon_cache.as_ref() {
            Some(cache) => Ok(&cache.pixmap),
            None => Err(RenderError::SurfaceAlloc { width, height }),
        }
    }
}

impl Renderer for PixmapRenderer {
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<FrameImage> {
        let snap = ctx.snapshot;
        let style = &ctx.style;
        let (width, height) = (snap.width(), snap.height());
        let mut frame = new_surface(width, height)?;

        // Base image
        frame.draw_pixmap(
            0,
            0,
            pixmap_ref(&snap.base),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        // Spotlight
        match &snap.spotlight {
            Some(SpotlightSource::Raster(mask)) => apply_spotlight(&mut frame, mask, style),
            Some(SpotlightSource::Polygons(polygons)) => {
                let mask = self.polygon_mask(polygons, width, height)?;
                apply_spotlight(&mut frame, mask, style);
            }
            None => {}
        }

        // Quill strokes
        for stroke in &snap.strokes {
            draw_quill_stroke(&mut frame, stroke, snap.pen_color);
        }
        if let Some(current) = &snap.current_stroke {
            draw_quill_stroke(&mut frame, current, snap.pen_color);
        }

        for marker in &snap.points {
            draw_marker(&mut frame, marker, style);
        }

        if ctx.hide_overlays {
            return Ok(FrameImage { pixmap: frame });
        }

        // Tool overlay, drawn on its own layer
        if !matches!(snap.overlay, ToolOverlay::None) {
            let mut layer = new_surface(width, height)?;
            match &snap.overlay {
                ToolOverlay::DragVector { start, end } => {
                    draw_drag_arrow(&mut layer, *start, *end, style);
                }
                ToolOverlay::FloatingSelection {
                    hole,
                    pixels,
                    bounds,
                    offset,
                } => draw_floating_selection(&mut layer, hole, pixels, *bounds, *offset, style),
                ToolOverlay::None => {}
            }
            composite(&mut frame, &layer);
        }

        if let Some(brush) = &snap.raster_brush {
            let mut layer = new_surface(width, height)?;
            draw_brush_layer(&mut layer, brush, style);
            composite(&mut frame, &layer);
        }

        Ok(FrameImage { pixmap: frame })
    }
}

fn new_surface(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width, height).ok_or(RenderError::SurfaceAlloc { width, height })
}

fn pixmap_ref(pixmap: &Pixmap) -> PixmapRef<'_> {
    pixmap.as_ref()
}

fn composite(frame: &mut Pixmap, layer: &Pixmap) {
    frame.draw_pixmap(
        0,
        0,
        layer.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
}

fn solid_paint(r: u8, g: u8, b: u8, a: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn color_paint(color: Color) -> Paint<'static> {
    let rgba = color.to_rgba8();
    solid_paint(rgba.r, rgba.g, rgba.b, rgba.a)
}

fn serializable_paint(color: SerializableColor) -> Paint<'static> {
    solid_paint(color.r, color.g, color.b, color.a)
}

fn round_stroke(width: f32) -> SkStroke {
    SkStroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..SkStroke::default()
    }
}

/// White-on-black membership raster of the polygons.
fn rasterize_polygons(polygons: &[Polygon], width: u32, height: u32) -> RenderResult<Pixmap> {
    let mut mask = new_surface(width, height)?;
    mask.fill(tiny_skia::Color::BLACK);
    let paint = solid_paint(255, 255, 255, 255);
    for path in polygons
        .iter()
        .filter_map(Polygon::to_path)
        .filter_map(|p| raster::to_skia_path(&p))
    {
        mask.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
    Ok(mask)
}

/// Brighten pixels inside the mask and darken the rest.
fn apply_spotlight(frame: &mut Pixmap, mask: &Pixmap, style: &RenderStyle) {
    if mask.width() != frame.width() || mask.height() != frame.height() {
        log::warn!(
            "spotlight mask {}x{} does not match frame {}x{}",
            mask.width(),
            mask.height(),
            frame.width(),
            frame.height()
        );
        return;
    }
    let scale = |v: u8, factor: f32| (f32::from(v) * factor).round().min(255.0) as u8;
    for (dst, m) in frame.pixels_mut().iter_mut().zip(mask.pixels()) {
        let m = m.demultiply();
        let inside = m.alpha() > style.spotlight_alpha_min && m.red() > style.spotlight_red_min;
        let factor = if inside {
            style.spotlight_brighten
        } else {
            style.spotlight_darken
        };
        let c = dst.demultiply();
        *dst = ColorU8::from_rgba(
            scale(c.red(), factor),
            scale(c.green(), factor),
            scale(c.blue(), factor),
            c.alpha(),
        )
        .premultiply();
    }
}

fn draw_quill_stroke(frame: &mut Pixmap, stroke: &Stroke, pen: SerializableColor) {
    let Some(path) = stroke.smoothed_path().and_then(|p| raster::to_skia_path(&p)) else {
        return;
    };
    let paint = serializable_paint(stroke.display_color(pen));
    frame.stroke_path(
        &path,
        &paint,
        &round_stroke(stroke.width as f32),
        Transform::identity(),
        None,
    );
}

/// "+" for foreground points, "-" for background points.
fn draw_marker(frame: &mut Pixmap, marker: &PointMarker, style: &RenderStyle) {
    let (x, y) = (marker.position.x() as f32, marker.position.y() as f32);
    let r = style.marker_radius;
    let mut pb = PathBuilder::new();
    pb.move_to(x - r, y);
    pb.line_to(x + r, y);
    if marker.label == PointLabel::Foreground {
        pb.move_to(x, y - r);
        pb.line_to(x, y + r);
    }
    let Some(path) = pb.finish() else {
        return;
    };
    let paint = serializable_paint(marker.label.color());
    let stroke = SkStroke {
        width: style.marker_width,
        ..SkStroke::default()
    };
    frame.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

/// Geometry of the drag-vector arrow for a frame of the given width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowMetrics {
    pub line_width: f64,
    pub head_length: f64,
    pub dot_radius: f64,
}

impl ArrowMetrics {
    pub fn for_width(frame_width: u32) -> Self {
        let w = f64::from(frame_width);
        let line_width = (w / 200.0).max(3.0);
        Self {
            line_width,
            head_length: (w / 40.0).max(20.0),
            dot_radius: line_width * 2.0,
        }
    }
}

fn draw_drag_arrow(layer: &mut Pixmap, start: ImagePoint, end: ImagePoint, style: &RenderStyle) {
    let metrics = ArrowMetrics::for_width(layer.width());
    let paint = color_paint(style.arrow_color);

    let mut pb = PathBuilder::new();
    pb.move_to(start.x() as f32, start.y() as f32);
    pb.line_to(end.x() as f32, end.y() as f32);
    if let Some(line) = pb.finish() {
        let stroke = SkStroke {
            width: metrics.line_width as f32,
            line_cap: LineCap::Round,
            ..SkStroke::default()
        };
        layer.stroke_path(&line, &paint, &stroke, Transform::identity(), None);
    }

    // Head tip sits 30% of the head length beyond the end point.
    let angle = (end.y() - start.y()).atan2(end.x() - start.x());
    let head = metrics.head_length;
    let tip = end + Vec2::from_angle(angle) * (head * 0.3);
    let spread = std::f64::consts::FRAC_PI_6;
    let left = tip + Vec2::from_angle(angle - spread) * -head;
    let right = tip + Vec2::from_angle(angle + spread) * -head;

    let mut pb = PathBuilder::new();
    pb.move_to(tip.x() as f32, tip.y() as f32);
    pb.line_to(left.x() as f32, left.y() as f32);
    pb.line_to(right.x() as f32, right.y() as f32);
    pb.close();
    if let Some(head_path) = pb.finish() {
        layer.fill_path(&head_path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    if let Some(dot) = PathBuilder::from_circle(
        start.x() as f32,
        start.y() as f32,
        metrics.dot_radius as f32,
    ) {
        layer.fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

fn draw_floating_selection(
    layer: &mut Pixmap,
    hole: &Arc<Pixmap>,
    pixels: &Arc<Pixmap>,
    bounds: PixelRect,
    offset: Vec2,
    style: &RenderStyle,
) {
    let rgba = style.move_overlay.to_rgba8();
    layer.fill(tiny_skia::Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a));

    let paint = PixmapPaint::default();
    layer.draw_pixmap(
        bounds.x as i32,
        bounds.y as i32,
        pixmap_ref(hole),
        &paint,
        Transform::identity(),
        None,
    );
    let target = Transform::from_translate(
        (f64::from(bounds.x) + offset.x) as f32,
        (f64::from(bounds.y) + offset.y) as f32,
    );
    layer.draw_pixmap(0, 0, pixmap_ref(pixels), &paint, target, None);
}

/// Dark veil with the mask punched out, plus the brush cursor ring.
fn draw_brush_layer(layer: &mut Pixmap, brush: &RasterBrushView, style: &RenderStyle) {
    let rgba = style.brush_overlay.to_rgba8();
    layer.fill(tiny_skia::Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a));

    let punch = PixmapPaint {
        blend_mode: BlendMode::DestinationOut,
        ..PixmapPaint::default()
    };
    let sx = layer.width() as f32 / brush.mask.width() as f32;
    let sy = layer.height() as f32 / brush.mask.height() as f32;
    layer.draw_pixmap(
        0,
        0,
        pixmap_ref(&brush.mask),
        &punch,
        Transform::from_scale(sx, sy),
        None,
    );

    if let Some(cursor) = brush.cursor {
        let radius = (brush.size / 2.0) as f32;
        if let Some(ring) = PathBuilder::from_circle(cursor.x() as f32, cursor.y() as f32, radius) {
            let paint = color_paint(style.cursor_color);
            layer.stroke_path(
                &ring,
                &paint,
                &round_stroke(style.cursor_width),
                Transform::identity(),
                None,
            );
        }
    }
}

/// Render a snapshot with default style; convenience for one-off exports.
pub fn render_snapshot(snapshot: &FrameSnapshot) -> RenderResult<FrameImage> {
    PixmapRenderer::new().render(&RenderContext::new(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_metrics_minimums() {
        let small = ArrowMetrics::for_width(100);
        assert!((small.line_width - 3.0).abs() < f64::EPSILON);
        assert!((small.head_length - 20.0).abs() < f64::EPSILON);
        assert!((small.dot_radius - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_arrow_metrics_scale_with_width() {
        let large = ArrowMetrics::for_width(2000);
        assert!((large.line_width - 10.0).abs() < f64::EPSILON);
        assert!((large.head_length - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_spotlight_factors() {
        let mut frame = Pixmap::new(2, 1).unwrap();
        frame.fill(tiny_skia::Color::from_rgba8(100, 100, 100, 255));
        let mut mask = Pixmap::new(2, 1).unwrap();
        mask.pixels_mut()[0] = ColorU8::from_rgba(255, 255, 255, 255).premultiply();

        apply_spotlight(&mut frame, &mask, &RenderStyle::default());
        let inside = raster::pixel_at(&frame, 0, 0).unwrap();
        let outside = raster::pixel_at(&frame, 1, 0).unwrap();
        assert_eq!(inside.red(), 130);
        assert_eq!(outside.red(), 50);
    }

    #[test]
    fn test_polygon_raster_is_white_inside() {
        let square = Polygon::new(vec![
            ImagePoint::new(2.0, 2.0),
            ImagePoint::new(8.0, 2.0),
            ImagePoint::new(8.0, 8.0),
            ImagePoint::new(2.0, 8.0),
        ]);
        let mask = rasterize_polygons(&[square], 10, 10).unwrap();
        assert_eq!(raster::pixel_at(&mask, 5, 5).unwrap().red(), 255);
        assert_eq!(raster::pixel_at(&mask, 0, 0).unwrap().red(), 0);
    }

    #[test]
    fn test_polygon_cache_reused() {
        let mut renderer = PixmapRenderer::new();
        let square = vec![Polygon::new(vec![
            ImagePoint::new(0.0, 0.0),
            ImagePoint::new(4.0, 0.0),
            ImagePoint::new(4.0, 4.0),
        ])];
        let first = renderer.polygon_mask(&square, 8, 8).unwrap().data().as_ptr();
        let second = renderer.polygon_mask(&square, 8, 8).unwrap().data().as_ptr();
        assert_eq!(first, second);
    }
}
