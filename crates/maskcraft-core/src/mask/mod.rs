//! The paintable mask layer and its encodings for remote APIs.

mod codec;
mod surface;

pub use codec::{
    WorkingImage, backend_mask, binary_mask_file, rescale_from_working, resize_to_working,
    vector_mask,
};
pub use surface::MaskSurface;

use crate::raster;
use serde::{Deserialize, Serialize};

/// Compositing rule for a mask stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaintMode {
    /// Union with the existing mask (source-over).
    #[default]
    Add,
    /// Erase from the existing mask (destination-out). Never adds coverage.
    Subtract,
}

/// An encoded binary mask: opaque non-black pixels are included, black
/// pixels are excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskFile {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl MaskFile {
    pub const FILE_NAME: &'static str = "mask.png";

    pub fn to_data_url(&self) -> String {
        raster::png_data_url(&self.png)
    }
}

/// Flatten an RGBA image onto an opaque background color.
pub(crate) fn flatten_onto(image: &image::RgbaImage, background: [u8; 3]) -> image::RgbaImage {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        let [r, g, b, a] = px.0;
        let a = u16::from(a);
        let blend = |fg: u8, bg: u8| ((u16::from(fg) * a + u16::from(bg) * (255 - a) + 127) / 255) as u8;
        px.0 = [
            blend(r, background[0]),
            blend(g, background[1]),
            blend(b, background[2]),
            255,
        ];
    }
    out
}
