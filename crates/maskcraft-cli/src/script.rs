//! JSON session scripts.
//!
//! A script is an ordered list of steps replayed through the engine, e.g.
//!
//! ```json
//! {
//!   "layout": { "x": 0, "y": 0, "width": 400, "height": 300 },
//!   "steps": [
//!     { "step": "flags", "flags": { "is_brush_active": true, "brush_size": 12 } },
//!     { "step": "pointer", "event": { "kind": "down", "id": 1, "position": { "x": 40, "y": 40 } } },
//!     { "step": "pointer", "event": { "kind": "up", "id": 1, "position": { "x": 80, "y": 40 } } },
//!     { "step": "render", "name": "after-brush" }
//!   ]
//! }
//! ```

use crate::error::{CliError, CliResult};
use kurbo::Rect;
use maskcraft_core::{PointSet, PointerEvent, Polygon, Stroke, ToolFlags};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-screen box of the surface container, in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutSpec {
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Replace the tool/menu flags.
    Flags { flags: ToolFlags },
    Pointer { event: PointerEvent },
    /// Move or resize the surface container.
    Layout { layout: LayoutSpec },
    Polygons { polygons: Vec<Polygon> },
    Points { points: PointSet },
    Strokes { strokes: Vec<Stroke> },
    ClearStrokes,
    /// Rasterize the current polygons into the mask.
    SeedMask,
    /// Load an external mask, relative to the script's directory.
    LoadMask { path: PathBuf },
    /// Write the current frame as `<name>.png`.
    Render { name: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Container box; defaults to the image size at the origin.
    #[serde(default)]
    pub layout: Option<LayoutSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(json: &str) -> CliResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> CliResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let script = Self::from_json(&json)?;
        log::info!("loaded script {} ({} steps)", path.display(), script.steps.len());
        Ok(script)
    }
}
