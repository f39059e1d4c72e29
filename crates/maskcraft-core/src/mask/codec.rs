//! Mask and image encodings expected by the remote model servers, which
//! work at a fixed resolution.

use super::{MaskFile, flatten_onto};
use crate::config::Resolution;
use crate::error::EngineResult;
use crate::image_buffer::ImageBuffer;
use crate::raster;
use crate::stroke::Stroke;
use image::RgbaImage;
use tiny_skia::{
    BlendMode, Color, LineCap, LineJoin, Paint, Pixmap, PixmapPaint, Stroke as SkStroke, Transform,
};

/// An image stretched to the working resolution, with its original size
/// kept for scaling results back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingImage {
    pub png: Vec<u8>,
    pub original: Resolution,
}

/// Re-encode a mask PNG at `target`, stretched over a black background.
pub fn binary_mask_file(mask_png: &[u8], target: Resolution) -> EngineResult<MaskFile> {
    let mask = raster::decode_rgba(mask_png)?;
    let resized = raster::resize_rgba(&mask, target.width, target.height);
    let flat = flatten_onto(&resized, [0, 0, 0]);
    Ok(MaskFile {
        png: raster::encode_png(target.width, target.height, flat.as_raw())?,
        width: target.width,
        height: target.height,
    })
}

/// Draw strokes white on black (or in their own color with `use_color`),
/// optionally over the base image.
pub fn vector_mask(
    strokes: &[Stroke],
    size: Resolution,
    use_color: bool,
    background: Option<&ImageBuffer>,
) -> EngineResult<Vec<u8>> {
    let mut pixmap = raster::new_pixmap(size.width, size.height)?;
    pixmap.fill(Color::BLACK);
    if let Some(image) = background {
        let sx = size.width as f32 / image.width() as f32;
        let sy = size.height as f32 / image.height() as f32;
        pixmap.draw_pixmap(
            0,
            0,
            image.as_pixmap().as_ref(),
            &PixmapPaint::default(),
            Transform::from_scale(sx, sy),
            None,
        );
    }

    for stroke in strokes {
        let color = match (use_color, stroke.color) {
            (true, Some(c)) => c,
            _ => crate::color::SerializableColor::white(),
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        draw_stroke(&mut pixmap, stroke, &paint);
    }
    raster::encode_pixmap_png(&pixmap)
}

/// Opaque black at the original resolution with the strokes cut out,
/// resized to `target`.
pub fn backend_mask(
    strokes: &[Stroke],
    original: Resolution,
    target: Resolution,
) -> EngineResult<Vec<u8>> {
    let mut pixmap = raster::new_pixmap(original.width, original.height)?;
    pixmap.fill(Color::BLACK);

    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.blend_mode = BlendMode::DestinationOut;
    for stroke in strokes {
        draw_stroke(&mut pixmap, stroke, &paint);
    }

    let resized = raster::resize_rgba(
        &raster::rgba_from_pixmap(&pixmap),
        target.width,
        target.height,
    );
    raster::encode_png(resized.width(), resized.height(), resized.as_raw())
}

/// Stretch an image onto a white canvas at the working resolution.
pub fn resize_to_working(image: &RgbaImage, target: Resolution) -> EngineResult<WorkingImage> {
    let resized = raster::resize_rgba(image, target.width, target.height);
    let flat = flatten_onto(&resized, [255, 255, 255]);
    Ok(WorkingImage {
        png: raster::encode_png(target.width, target.height, flat.as_raw())?,
        original: Resolution::new(image.width(), image.height()),
    })
}

/// Stretch a working-resolution result back to the original size.
pub fn rescale_from_working(bytes: &[u8], original: Resolution) -> EngineResult<RgbaImage> {
    let image = raster::decode_rgba(bytes)?;
    Ok(raster::resize_rgba(&image, original.width, original.height))
}

fn draw_stroke(pixmap: &mut Pixmap, stroke: &Stroke, paint: &Paint) {
    let Some(path) = stroke.smoothed_path().and_then(|p| raster::to_skia_path(&p)) else {
        return;
    };
    let sk_stroke = SkStroke {
        width: stroke.width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..SkStroke::default()
    };
    pixmap.stroke_path(&path, paint, &sk_stroke, Transform::identity(), None);
}
