//! Coordinate spaces and the "contain" letterbox mapping.
//!
//! Three spaces are kept apart by type:
//! - client space: raw pointer positions reported by the host,
//! - display space: client space relative to the rendering surface's box,
//! - image space: the pixel grid of the image buffer.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

macro_rules! coordinate_space {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Point);

        impl $name {
            pub const ZERO: Self = Self(Point::ZERO);

            pub const fn new(x: f64, y: f64) -> Self {
                Self(Point::new(x, y))
            }

            pub fn x(&self) -> f64 {
                self.0.x
            }

            pub fn y(&self) -> f64 {
                self.0.y
            }

            pub fn distance(&self, other: Self) -> f64 {
                self.0.distance(other.0)
            }
        }

        impl From<Point> for $name {
            fn from(p: Point) -> Self {
                Self(p)
            }
        }
    };
}

coordinate_space!(
    /// A pointer position as reported by the host, in client pixels.
    ClientPoint
);
coordinate_space!(
    /// A position relative to the rendering surface's on-screen box.
    DisplayPoint
);
coordinate_space!(
    /// A position on the image buffer's pixel grid.
    ImagePoint
);

impl std::ops::Sub for ImagePoint {
    type Output = Vec2;

    fn sub(self, rhs: Self) -> Vec2 {
        self.0 - rhs.0
    }
}

impl std::ops::Add<Vec2> for ImagePoint {
    type Output = Self;

    fn add(self, rhs: Vec2) -> Self {
        Self(self.0 + rhs)
    }
}

/// A pointer position resolved into both display and image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedPoint {
    pub image: ImagePoint,
    pub display: DisplayPoint,
}

/// Scale and centering offset of a buffer fitted into a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f64,
    pub offset: Vec2,
}

/// The rendering surface: its on-screen box in client space plus the
/// intrinsic pixel resolution of the buffer drawn into it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceBox {
    /// Bounding box in client coordinates.
    pub bounds: Rect,
    /// Intrinsic buffer resolution.
    pub buffer: Size,
}

impl SurfaceBox {
    pub fn new(bounds: Rect, buffer: Size) -> Self {
        Self { bounds, buffer }
    }

    /// Compute the "contain" fit of the buffer inside the box.
    pub fn letterbox(&self) -> Letterbox {
        let (box_w, box_h) = (self.bounds.width(), self.bounds.height());
        let (buf_w, buf_h) = (self.buffer.width, self.buffer.height);
        let scale = (box_w / buf_w).min(box_h / buf_h);
        if !scale.is_finite() || scale <= 0.0 {
            return Letterbox {
                scale: 1.0,
                offset: Vec2::ZERO,
            };
        }
        Letterbox {
            scale,
            offset: Vec2::new((box_w - buf_w * scale) / 2.0, (box_h - buf_h * scale) / 2.0),
        }
    }

    /// Client position relative to the box origin.
    pub fn to_display(&self, client: ClientPoint) -> DisplayPoint {
        DisplayPoint::new(client.x() - self.bounds.x0, client.y() - self.bounds.y0)
    }

    /// Map a client position into display and image space.
    ///
    /// Recompute per event: the box moves and resizes under reflow and zoom.
    pub fn map(&self, client: ClientPoint) -> MappedPoint {
        let display = self.to_display(client);
        let fit = self.letterbox();
        let image = ImagePoint::new(
            (display.x() - fit.offset.x) / fit.scale,
            (display.y() - fit.offset.y) / fit.scale,
        );
        MappedPoint { image, display }
    }

    /// Inverse of [`map`](Self::map) for overlay widgets positioned on screen.
    pub fn image_to_display(&self, image: ImagePoint) -> DisplayPoint {
        let fit = self.letterbox();
        DisplayPoint::new(
            image.x() * fit.scale + fit.offset.x,
            image.y() * fit.scale + fit.offset.y,
        )
    }
}

/// An integer, axis-aligned pixel rectangle in image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Geometric center, `(x + w/2, y + h/2)`.
    pub fn center(&self) -> ImagePoint {
        ImagePoint::new(
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x + self.width),
            f64::from(self.y + self.height),
        )
    }

    /// Whether an image-space point falls inside the rectangle translated by `offset`.
    pub fn contains_offset(&self, point: ImagePoint, offset: Vec2) -> bool {
        let r = self.to_rect() + offset;
        point.x() >= r.x0 && point.x() <= r.x1 && point.y() >= r.y0 && point.y() <= r.y1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(x: f64, y: f64, w: f64, h: f64, bw: f64, bh: f64) -> SurfaceBox {
        SurfaceBox::new(Rect::new(x, y, x + w, y + h), Size::new(bw, bh))
    }

    #[test]
    fn test_identity_mapping() {
        let s = surface(0.0, 0.0, 200.0, 100.0, 200.0, 100.0);
        for (x, y) in [(0.0, 0.0), (13.5, 77.25), (199.0, 99.0), (100.0, 50.0)] {
            let mapped = s.map(ClientPoint::new(x, y));
            assert!((mapped.image.x() - mapped.display.x()).abs() < f64::EPSILON);
            assert!((mapped.image.y() - mapped.display.y()).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_display_is_box_relative() {
        let s = surface(40.0, 30.0, 200.0, 100.0, 200.0, 100.0);
        let mapped = s.map(ClientPoint::new(50.0, 35.0));
        assert!((mapped.display.x() - 10.0).abs() < f64::EPSILON);
        assert!((mapped.display.y() - 5.0).abs() < f64::EPSILON);
        assert!((mapped.image.x() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_horizontal_letterbox() {
        // 100x100 buffer in a 400x200 box: scale 2, 100px bars left and right.
        let s = surface(0.0, 0.0, 400.0, 200.0, 100.0, 100.0);
        let fit = s.letterbox();
        assert!((fit.scale - 2.0).abs() < f64::EPSILON);
        assert!((fit.offset.x - 100.0).abs() < f64::EPSILON);
        assert!(fit.offset.y.abs() < f64::EPSILON);

        let mapped = s.map(ClientPoint::new(150.0, 60.0));
        assert!((mapped.image.x() - 25.0).abs() < 1e-10);
        assert!((mapped.image.y() - 30.0).abs() < 1e-10);
    }

    #[test]
    fn test_vertical_letterbox_roundtrip() {
        let s = surface(12.0, 8.0, 300.0, 500.0, 600.0, 400.0);
        let original = ImagePoint::new(123.0, 321.0);
        let display = s.image_to_display(original);
        let client = ClientPoint::new(display.x() + 12.0, display.y() + 8.0);
        let back = s.map(client).image;
        assert!((back.x() - original.x()).abs() < 1e-9);
        assert!((back.y() - original.y()).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_buffer() {
        let s = surface(0.0, 0.0, 100.0, 100.0, 0.0, 0.0);
        let mapped = s.map(ClientPoint::new(5.0, 6.0));
        assert!((mapped.image.x() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pixel_rect_center() {
        let r = PixelRect::new(10, 10, 40, 40);
        assert_eq!(r.center(), ImagePoint::new(30.0, 30.0));
        assert!(r.contains_offset(ImagePoint::new(65.0, 30.0), Vec2::new(20.0, 0.0)));
        assert!(!r.contains_offset(ImagePoint::new(15.0, 30.0), Vec2::new(20.0, 0.0)));
    }
}
