//! The authoritative base image.

use crate::error::{EngineError, EngineResult};
use crate::raster;
use image::RgbaImage;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tiny_skia::Pixmap;

/// Encoded image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }
}

/// Source pixels at native resolution. Immutable once loaded; cloning
/// shares the pixel data.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pixmap: Arc<Pixmap>,
    format: Option<ImageFormat>,
}

impl ImageBuffer {
    /// Decode PNG, JPEG or WebP bytes.
    pub fn decode(bytes: &[u8]) -> EngineResult<Self> {
        let format = ImageFormat::from_magic_bytes(bytes);
        if format.is_none() {
            return Err(EngineError::Decode("unrecognized image format".into()));
        }
        let rgba = raster::decode_rgba(bytes)?;
        let mut buffer = Self::from_rgba_image(&rgba)?;
        buffer.format = format;
        Ok(buffer)
    }

    pub fn from_rgba_image(image: &RgbaImage) -> EngineResult<Self> {
        Ok(Self {
            pixmap: Arc::new(raster::pixmap_from_rgba(image)?),
            format: None,
        })
    }

    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self {
            pixmap: Arc::new(pixmap),
            format: None,
        }
    }

    /// A solid-color image, mostly useful for tests.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> EngineResult<Self> {
        let image = RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        Self::from_rgba_image(&image)
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        raster::rgba_from_pixmap(&self.pixmap)
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

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn as_pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn shared_pixmap(&self) -> Arc<Pixmap> {
        Arc::clone(&self.pixmap)
    }
}
