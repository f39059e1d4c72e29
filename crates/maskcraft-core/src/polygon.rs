//! Segmentation polygons and labeled point markers.

use crate::color::SerializableColor;
use crate::coords::ImagePoint;
use kurbo::BezPath;
use serde::{Deserialize, Serialize};

/// A closed image-space outline produced by segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<ImagePoint>,
    #[serde(default = "Polygon::default_color")]
    pub color: SerializableColor,
}

impl Polygon {
    pub fn new(points: Vec<ImagePoint>) -> Self {
        Self {
            points,
            color: Self::default_color(),
        }
    }

    pub fn with_color(mut self, color: SerializableColor) -> Self {
        self.color = color;
        self
    }

    fn default_color() -> SerializableColor {
        SerializableColor::new(0, 255, 255, 255)
    }

    /// Closed path through the points, or `None` for fewer than three.
    pub fn to_path(&self) -> Option<BezPath> {
        if self.points.len() < 3 {
            return None;
        }
        let mut path = BezPath::new();
        path.move_to(self.points[0].0);
        for p in &self.points[1..] {
            path.line_to(p.0);
        }
        path.close_path();
        Some(path)
    }
}

/// Foreground or background click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointLabel {
    #[serde(rename = "fg")]
    Foreground,
    #[serde(rename = "bg")]
    Background,
}

impl PointLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointLabel::Foreground => "fg",
            PointLabel::Background => "bg",
        }
    }

    pub fn color(&self) -> SerializableColor {
        match self {
            PointLabel::Foreground => SerializableColor::new(0, 200, 0, 255),
            PointLabel::Background => SerializableColor::new(230, 0, 0, 255),
        }
    }
}

/// A labeled click, drawn as a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointMarker {
    pub label: PointLabel,
    pub position: ImagePoint,
}

/// Click history of the add/subtract workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    #[serde(default)]
    pub foreground: Vec<ImagePoint>,
    #[serde(default)]
    pub background: Vec<ImagePoint>,
}

impl PointSet {
    pub fn is_empty(&self) -> bool {
        self.foreground.is_empty() && self.background.is_empty()
    }

    pub fn markers(&self) -> impl Iterator<Item = PointMarker> + '_ {
        let fg = self.foreground.iter().map(|&position| PointMarker {
            label: PointLabel::Foreground,
            position,
        });
        let bg = self.background.iter().map(|&position| PointMarker {
            label: PointLabel::Background,
            position,
        });
        fg.chain(bg)
    }

    /// First marker strictly within `radius` of `at`: its label and its
    /// index within that label's list. Foreground points win ties.
    pub fn hit_test(&self, at: ImagePoint, radius: f64) -> Option<(PointLabel, usize)> {
        let find = |list: &[ImagePoint]| list.iter().position(|p| p.distance(at) < radius);
        find(&self.foreground)
            .map(|i| (PointLabel::Foreground, i))
            .or_else(|| find(&self.background).map(|i| (PointLabel::Background, i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_path() {
        let poly = Polygon::new(vec![
            ImagePoint::new(0.0, 0.0),
            ImagePoint::new(4.0, 0.0),
            ImagePoint::new(4.0, 4.0),
        ]);
        let path = poly.to_path().unwrap();
        assert_eq!(path.elements().len(), 4);
        assert!(Polygon::new(vec![ImagePoint::ZERO]).to_path().is_none());
    }

    #[test]
    fn test_hit_test_uses_own_list_index() {
        let points = PointSet {
            foreground: vec![ImagePoint::new(0.0, 0.0), ImagePoint::new(100.0, 100.0)],
            background: vec![ImagePoint::new(300.0, 0.0), ImagePoint::new(200.0, 200.0)],
        };
        assert_eq!(
            points.hit_test(ImagePoint::new(105.0, 100.0), 20.0),
            Some((PointLabel::Foreground, 1))
        );
        assert_eq!(
            points.hit_test(ImagePoint::new(210.0, 200.0), 20.0),
            Some((PointLabel::Background, 1))
        );
        assert_eq!(points.hit_test(ImagePoint::new(50.0, 50.0), 20.0), None);
        assert_eq!(points.markers().count(), 4);
    }

    #[test]
    fn test_polygon_json() {
        let poly: Polygon =
            serde_json::from_str(r#"{"points":[{"x":1.0,"y":2.0}],"color":{"r":1,"g":2,"b":3,"a":4}}"#)
                .unwrap();
        assert_eq!(poly.points[0], ImagePoint::new(1.0, 2.0));
        assert_eq!(poly.color, SerializableColor::new(1, 2, 3, 4));
    }
}
