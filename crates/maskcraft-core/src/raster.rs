//! Conversions between pixmaps, RGBA images, PNG bytes and paths.

use crate::error::{EngineError, EngineResult};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use kurbo::{BezPath, PathEl};
use tiny_skia::{ColorU8, Pixmap};

/// Allocate a transparent pixmap.
pub fn new_pixmap(width: u32, height: u32) -> EngineResult<Pixmap> {
    Pixmap::new(width, height).ok_or(EngineError::InvalidSize { width, height })
}

/// Premultiply a straight-alpha RGBA image into a pixmap.
pub fn pixmap_from_rgba(image: &RgbaImage) -> EngineResult<Pixmap> {
    let mut pixmap = new_pixmap(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Demultiply a pixmap into a straight-alpha RGBA image.
pub fn rgba_from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .unwrap_or_else(|| RgbaImage::new(pixmap.width(), pixmap.height()))
}

/// Straight-alpha color of one pixel.
pub fn pixel_at(pixmap: &Pixmap, x: u32, y: u32) -> Option<ColorU8> {
    pixmap.pixel(x, y).map(|p| p.demultiply())
}

/// Encode straight-alpha RGBA8 bytes as PNG.
pub fn encode_png(width: u32, height: u32, rgba: &[u8]) -> EngineResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = ::png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(::png::ColorType::Rgba);
        encoder.set_depth(::png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| EngineError::Encode(e.to_string()))?;
        writer
            .write_image_data(rgba)
            .map_err(|e| EngineError::Encode(e.to_string()))?;
    }
    Ok(png_data)
}

pub fn encode_pixmap_png(pixmap: &Pixmap) -> EngineResult<Vec<u8>> {
    let image = rgba_from_pixmap(pixmap);
    encode_png(image.width(), image.height(), image.as_raw())
}

/// Decode any supported image format into RGBA8.
pub fn decode_rgba(bytes: &[u8]) -> EngineResult<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| EngineError::Decode(e.to_string()))
}

/// Stretch an image to the given size.
pub fn resize_rgba(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.width() == width && image.height() == height {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// `data:image/png;base64,...` URL for API payloads.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Convert a kurbo path into a tiny-skia path.
pub fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = tiny_skia::PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_rgba_roundtrip_opaque() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));
        let pixmap = pixmap_from_rgba(&img).unwrap();
        let back = rgba_from_pixmap(&pixmap);
        assert_eq!(back.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(back.get_pixel(1, 0).0[3], 0);
    }

    #[test]
    fn test_pixel_at_demultiplies() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([200, 100, 50, 255]));
        let pixmap = pixmap_from_rgba(&img).unwrap();
        let c = pixel_at(&pixmap, 0, 0).unwrap();
        assert_eq!((c.red(), c.green(), c.blue(), c.alpha()), (200, 100, 50, 255));
        assert_eq!(pixel_at(&pixmap, 1, 0).unwrap().alpha(), 0);
        assert!(pixel_at(&pixmap, 2, 0).is_none());
    }

    #[test]
    fn test_png_encode_decode() {
        let rgba = vec![255u8, 0, 0, 255, 0, 255, 0, 255];
        let png = encode_png(2, 1, &rgba).unwrap();
        let decoded = decode_rgba(&png).unwrap();
        assert_eq!(decoded.as_raw(), &rgba);
    }

    #[test]
    fn test_data_url_prefix() {
        assert!(png_data_url(&[1, 2, 3]).starts_with("data:image/png;base64,AQID"));
    }

    #[test]
    fn test_zero_size_pixmap_is_error() {
        assert!(matches!(new_pixmap(0, 10), Err(EngineError::InvalidSize { .. })));
    }

    #[test]
    fn test_path_conversion() {
        let mut path = BezPath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(10.0, 0.0));
        path.line_to(Point::new(10.0, 10.0));
        path.close_path();
        let skia = to_skia_path(&path).unwrap();
        assert!((skia.bounds().width() - 10.0).abs() < f32::EPSILON);
        assert!(to_skia_path(&BezPath::new()).is_none());
    }
}
