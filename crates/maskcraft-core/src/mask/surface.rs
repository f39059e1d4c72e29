use super::{MaskFile, PaintMode, flatten_onto};
use crate::coords::{ImagePoint, PixelRect};
use crate::error::{EngineError, EngineResult};
use crate::polygon::Polygon;
use crate::raster;
use image::RgbaImage;
use kurbo::{Affine, Size};
use std::sync::Arc;
use tiny_skia::{
    BlendMode, Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke,
    Transform,
};

/// Off-screen raster mask at the base image's resolution.
///
/// Pixel alpha encodes inclusion (0 = excluded). Cloning is cheap and
/// copy-on-write, so a clone doubles as an undo checkpoint.
#[derive(Debug, Clone)]
pub struct MaskSurface {
    pixmap: Arc<Pixmap>,
}

impl MaskSurface {
    pub fn new(width: u32, height: u32) -> EngineResult<Self> {
        Ok(Self {
            pixmap: Arc::new(raster::new_pixmap(width, height)?),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width()), f64::from(self.height()))
    }

    pub fn as_pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn shared_pixmap(&self) -> Arc<Pixmap> {
        Arc::clone(&self.pixmap)
    }

    pub fn clear(&mut self) {
        Arc::make_mut(&mut self.pixmap).fill(Color::TRANSPARENT);
    }

    /// Draw a round-capped, round-joined stroke (or a dot for a single
    /// point) of diameter `size`.
    ///
    /// Coverage is not anti-aliased, so painting the same stroke twice in
    /// [`PaintMode::Add`] leaves the mask unchanged.
    pub fn paint_stroke(&mut self, points: &[ImagePoint], size: f64, mode: PaintMode) {
        let Some(first) = points.first() else {
            return;
        };
        if size <= 0.0 {
            return;
        }

        let mut paint = Paint::default();
        paint.set_color_rgba8(255, 255, 255, 255);
        paint.anti_alias = false;
        paint.blend_mode = match mode {
            PaintMode::Add => BlendMode::SourceOver,
            PaintMode::Subtract => BlendMode::DestinationOut,
        };

        let pixmap = Arc::make_mut(&mut self.pixmap);
        let is_dot = points.iter().all(|p| p == first);
        if is_dot {
            let radius = (size / 2.0) as f32;
            if let Some(circle) = PathBuilder::from_circle(first.x() as f32, first.y() as f32, radius) {
                pixmap.fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);
            }
            return;
        }

        let mut pb = PathBuilder::new();
        pb.move_to(first.x() as f32, first.y() as f32);
        for p in &points[1..] {
            pb.line_to(p.x() as f32, p.y() as f32);
        }
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width: size as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    /// Clear, then fill every polygon solid opaque. Polygon points are in
    /// image space of `image_size` and scaled to the surface.
    pub fn seed_from_polygons(&mut self, polygons: &[Polygon], image_size: Size) {
        self.clear();
        if image_size.is_zero_area() {
            return;
        }
        let scale = Affine::scale_non_uniform(
            self.size().width / image_size.width,
            self.size().height / image_size.height,
        );

        let mut paint = Paint::default();
        paint.set_color_rgba8(255, 255, 255, 255);
        paint.anti_alias = false;

        let pixmap = Arc::make_mut(&mut self.pixmap);
        for polygon in polygons {
            let Some(path) = polygon.to_path().and_then(|p| raster::to_skia_path(&(scale * p)))
            else {
                continue;
            };
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
        log::debug!("mask seeded from {} polygon(s)", polygons.len());
    }

    /// Load an externally produced mask. Near-black pixels (every RGB
    /// channel below `black_threshold`) become transparent; a size
    /// mismatch is resolved by rescaling.
    pub fn load_external(&mut self, image: &RgbaImage, black_threshold: u8) -> EngineResult<()> {
        let (w, h) = (self.width(), self.height());
        if image.width() != w || image.height() != h {
            log::info!(
                "rescaling external mask from {}x{} to {}x{}",
                image.width(),
                image.height(),
                w,
                h
            );
        }
        let mut scaled = raster::resize_rgba(image, w, h);
        for px in scaled.pixels_mut() {
            let [r, g, b, _] = px.0;
            if r < black_threshold && g < black_threshold && b < black_threshold {
                px.0[3] = 0;
            }
        }
        self.pixmap = Arc::new(raster::pixmap_from_rgba(&scaled)?);
        Ok(())
    }

    pub fn load_external_bytes(&mut self, bytes: &[u8], black_threshold: u8) -> EngineResult<()> {
        let image = raster::decode_rgba(bytes)?;
        self.load_external(&image, black_threshold)
    }

    /// Replace the content with an earlier checkpoint of the same size.
    pub fn restore(&mut self, checkpoint: MaskSurface) {
        if checkpoint.width() == self.width() && checkpoint.height() == self.height() {
            *self = checkpoint;
        }
    }

    /// Straight-alpha RGBA copy of the mask.
    pub fn to_rgba_image(&self) -> RgbaImage {
        raster::rgba_from_pixmap(&self.pixmap)
    }

    /// Encode the mask over an opaque black background.
    pub fn to_file(&self) -> EngineResult<MaskFile> {
        let flat = flatten_onto(&self.to_rgba_image(), [0, 0, 0]);
        let png = raster::encode_png(flat.width(), flat.height(), flat.as_raw())?;
        Ok(MaskFile {
            png,
            width: flat.width(),
            height: flat.height(),
        })
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.pixmap.pixel(x, y).map_or(0, |p| p.alpha())
    }

    /// Number of pixels with non-zero alpha.
    pub fn coverage(&self) -> usize {
        self.pixmap.pixels().iter().filter(|p| p.alpha() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.pixmap.pixels().iter().all(|p| p.alpha() == 0)
    }

    /// Bounding box of pixels whose alpha is at least `threshold`.
    pub fn opaque_bounds(&self, threshold: u8) -> Option<PixelRect> {
        let width = self.width();
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0u32, 0u32);
        for (i, px) in self.pixmap.pixels().iter().enumerate() {
            if px.alpha() == 0 || px.alpha() < threshold {
                continue;
            }
            let (x, y) = (i as u32 % width, i as u32 / width);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        if min_x == u32::MAX {
            return None;
        }
        Some(PixelRect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }
}

impl TryFrom<&RgbaImage> for MaskSurface {
    type Error = EngineError;

    /// Wrap an RGBA image as-is, without black normalization.
    fn try_from(image: &RgbaImage) -> EngineResult<Self> {
        Ok(Self {
            pixmap: Arc::new(raster::pixmap_from_rgba(image)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(list: &[(f64, f64)]) -> Vec<ImagePoint> {
        list.iter().map(|&(x, y)| ImagePoint::new(x, y)).collect()
    }

    fn square() -> Polygon {
        Polygon::new(pts(&[(10.0, 10.0), (50.0, 10.0), (50.0, 50.0), (10.0, 50.0)]))
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut mask = MaskSurface::new(64, 64).unwrap();
        let stroke = pts(&[(5.0, 5.0), (40.0, 20.0), (30.0, 50.0)]);
        mask.paint_stroke(&stroke, 7.0, PaintMode::Add);
        let once = mask.as_pixmap().data().to_vec();
        mask.paint_stroke(&stroke, 7.0, PaintMode::Add);
        assert_eq!(mask.as_pixmap().data(), once.as_slice());
        assert!(mask.coverage() > 0);
    }

    #[test]
    fn test_subtract_never_adds() {
        let mut mask = MaskSurface::new(32, 32).unwrap();
        mask.paint_stroke(&pts(&[(16.0, 16.0), (20.0, 20.0)]), 10.0, PaintMode::Subtract);
        assert!(mask.is_empty());

        mask.paint_stroke(&pts(&[(5.0, 5.0)]), 6.0, PaintMode::Add);
        let before = mask.coverage();
        mask.paint_stroke(&pts(&[(25.0, 25.0), (28.0, 28.0)]), 4.0, PaintMode::Subtract);
        assert_eq!(mask.coverage(), before);
    }

    #[test]
    fn test_subtract_erases() {
        let mut mask = MaskSurface::new(32, 32).unwrap();
        mask.paint_stroke(&pts(&[(16.0, 16.0)]), 10.0, PaintMode::Add);
        assert!(mask.alpha_at(16, 16) > 0);
        mask.paint_stroke(&pts(&[(16.0, 16.0)]), 12.0, PaintMode::Subtract);
        assert_eq!(mask.alpha_at(16, 16), 0);
    }

    #[test]
    fn test_seed_square_bounds() {
        let mut mask = MaskSurface::new(100, 100).unwrap();
        mask.paint_stroke(&pts(&[(90.0, 90.0)]), 4.0, PaintMode::Add);
        mask.seed_from_polygons(&[square()], Size::new(100.0, 100.0));
        assert_eq!(mask.opaque_bounds(1), Some(PixelRect::new(10, 10, 40, 40)));
        assert_eq!(mask.coverage(), 1600);
    }

    #[test]
    fn test_seed_scales_to_surface() {
        let mut mask = MaskSurface::new(50, 50).unwrap();
        mask.seed_from_polygons(&[square()], Size::new(100.0, 100.0));
        assert_eq!(mask.opaque_bounds(1), Some(PixelRect::new(5, 5, 20, 20)));
    }

    #[test]
    fn test_load_external_drops_black() {
        let mut img = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        img.put_pixel(2, 2, image::Rgba([19, 19, 19, 255]));
        img.put_pixel(3, 3, image::Rgba([20, 0, 0, 255]));
        let mut mask = MaskSurface::new(4, 4).unwrap();
        mask.load_external(&img, 20).unwrap();
        assert_eq!(mask.alpha_at(0, 0), 0);
        assert_eq!(mask.alpha_at(1, 1), 255);
        assert_eq!(mask.alpha_at(2, 2), 0);
        assert_eq!(mask.alpha_at(3, 3), 255);
    }

    #[test]
    fn test_load_external_rescales() {
        let img = RgbaImage::from_pixel(512, 512, image::Rgba([255, 255, 255, 255]));
        let mut mask = MaskSurface::new(100, 60).unwrap();
        mask.load_external(&img, 20).unwrap();
        assert_eq!(mask.width(), 100);
        assert_eq!(mask.coverage(), 6000);
    }

    #[test]
    fn test_file_roundtrip() {
        let mut mask = MaskSurface::new(100, 100).unwrap();
        mask.seed_from_polygons(&[square()], Size::new(100.0, 100.0));
        let file = mask.to_file().unwrap();
        let decoded = raster::decode_rgba(&file.png).unwrap();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(30, 30).0, [255, 255, 255, 255]);

        let mut other = MaskSurface::new(100, 100).unwrap();
        other.load_external_bytes(&file.png, 20).unwrap();
        assert_eq!(other.opaque_bounds(1), mask.opaque_bounds(1));
        assert_eq!(other.coverage(), mask.coverage());
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut mask = MaskSurface::new(16, 16).unwrap();
        let checkpoint = mask.clone();
        mask.paint_stroke(&pts(&[(8.0, 8.0)]), 6.0, PaintMode::Add);
        assert!(checkpoint.is_empty());
        mask.restore(checkpoint);
        assert!(mask.is_empty());
    }
}
