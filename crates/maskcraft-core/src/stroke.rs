//! Quill strokes for the multi-mask editing API.

use crate::color::{self, SerializableColor};
use crate::coords::ImagePoint;
use crate::tools::QuillMode;
use kurbo::BezPath;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a stroke asks the downstream editor to do. Serialized as the
/// numeric `type` the API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum StrokeIntent {
    Subtract = 0,
    Add = 1,
    Color = 2,
}

impl From<StrokeIntent> for u8 {
    fn from(intent: StrokeIntent) -> Self {
        intent as u8
    }
}

impl TryFrom<u8> for StrokeIntent {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StrokeIntent::Subtract),
            1 => Ok(StrokeIntent::Add),
            2 => Ok(StrokeIntent::Color),
            other => Err(format!("unknown stroke type {other}")),
        }
    }
}

/// A recorded freehand stroke in image space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    #[serde(skip, default = "Uuid::new_v4")]
    pub id: Uuid,
    pub points: Vec<ImagePoint>,
    #[serde(rename = "type")]
    pub intent: StrokeIntent,
    #[serde(with = "color::hex_opt", default)]
    pub color: Option<SerializableColor>,
    pub width: f64,
}

impl Stroke {
    pub fn new(intent: StrokeIntent, width: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            points: Vec::new(),
            intent,
            color: None,
            width,
        }
    }

    /// Whether there is enough geometry to draw.
    pub fn is_drawable(&self) -> bool {
        self.points.len() > 1
    }

    /// Path through the points with quadratic midpoint smoothing: each
    /// recorded point is a control point, each segment ends halfway to
    /// the next one.
    pub fn smoothed_path(&self) -> Option<BezPath> {
        if !self.is_drawable() {
            return None;
        }
        let mut path = BezPath::new();
        path.move_to(self.points[0].0);
        for pair in self.points.windows(2) {
            let (cp, ep) = (pair[0].0, pair[1].0);
            path.quad_to(cp, cp.midpoint(ep));
        }
        Some(path)
    }

    /// Color drawn on screen.
    pub fn display_color(&self, pen: SerializableColor) -> SerializableColor {
        match self.intent {
            StrokeIntent::Add => SerializableColor::new(0, 255, 0, 128),
            StrokeIntent::Subtract => SerializableColor::new(255, 0, 0, 128),
            StrokeIntent::Color => self.color.unwrap_or(pen),
        }
    }

    /// Whether this stroke is shown while `mode` is the selected quill.
    pub fn visible_under(&self, mode: Option<QuillMode>) -> bool {
        match mode {
            Some(QuillMode::Color) => self.intent == StrokeIntent::Color,
            Some(QuillMode::Add | QuillMode::Subtract) => self.intent != StrokeIntent::Color,
            None => true,
        }
    }
}

/// Records strokes while the quill is active.
#[derive(Debug, Clone)]
pub struct StrokeRecorder {
    strokes: Vec<Stroke>,
    current: Option<Stroke>,
    min_spacing: f64,
}

impl Default for StrokeRecorder {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl StrokeRecorder {
    pub fn new(min_spacing: f64) -> Self {
        Self {
            strokes: Vec::new(),
            current: None,
            min_spacing,
        }
    }

    /// Start a stroke. Color strokes carry the pen color.
    pub fn begin(&mut self, at: ImagePoint, mode: QuillMode, width: f64, pen: SerializableColor) {
        let mut stroke = Stroke::new(mode.intent(), width);
        if mode == QuillMode::Color {
            stroke.color = Some(pen);
        }
        stroke.points.push(at);
        self.current = Some(stroke);
    }

    /// Append a point if it is far enough from the previous one.
    pub fn extend(&mut self, at: ImagePoint) -> bool {
        let Some(stroke) = self.current.as_mut() else {
            return false;
        };
        let far_enough = stroke
            .points
            .last()
            .is_none_or(|last| last.distance(at) >= self.min_spacing);
        if far_enough {
            stroke.points.push(at);
        }
        far_enough
    }

    /// Finish the in-progress stroke. Returns `true` if the list changed.
    pub fn commit(&mut self) -> bool {
        match self.current.take() {
            Some(stroke) if !stroke.points.is_empty() => {
                self.strokes.push(stroke);
                true
            }
            _ => false,
        }
    }

    /// Discard the in-progress stroke.
    pub fn cancel(&mut self) -> bool {
        let had_stroke = self.current.take().is_some();
        if had_stroke {
            log::debug!("quill stroke discarded");
        }
        had_stroke
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.current = None;
    }

    pub fn set_strokes(&mut self, strokes: Vec<Stroke>) {
        self.strokes = strokes;
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn current(&self) -> Option<&Stroke> {
        self.current.as_ref()
    }

    /// Committed strokes shown under the given quill selection.
    pub fn visible(&self, mode: Option<QuillMode>) -> Vec<Stroke> {
        self.strokes
            .iter()
            .filter(|s| s.visible_under(mode))
            .cloned()
            .collect()
    }

    /// JSON payload for the editing API.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.strokes)
    }
}
