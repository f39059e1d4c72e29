//! Tool and menu flags supplied by the host, and the in-flight interaction.

use crate::color::{self, SerializableColor};
use crate::coords::ImagePoint;
use crate::mask::{MaskSurface, PaintMode};
use crate::stroke::StrokeIntent;
use serde::{Deserialize, Serialize};

// Use web-time on WASM, std::time otherwise
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Image-edit tools that take over single-pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Erase,
    Move,
    Drag,
}

/// Menus of the editing shell. Only a few change engine behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MenuKind {
    #[default]
    Main,
    /// Foreground/background point clicking.
    AddSubtract,
    Second,
    /// Assistant menu: raster brush forced on, always additive.
    #[serde(rename = "star")]
    Assistant,
    Tools,
    Crop,
    Magic,
    Selection,
    Upscale,
    AspectRatio,
}

/// Whether mask edits include or exclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Add,
    Subtract,
}

/// Click modes for which point clicks are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickMode {
    Add,
    Subtract,
    Select,
}

/// Quill brush selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuillMode {
    Add,
    Subtract,
    Color,
}

impl QuillMode {
    pub fn intent(self) -> StrokeIntent {
        match self {
            QuillMode::Add => StrokeIntent::Add,
            QuillMode::Subtract => StrokeIntent::Subtract,
            QuillMode::Color => StrokeIntent::Color,
        }
    }
}

/// Tool/mode flags owned by the host's menu state.
///
/// The engine reads these and reacts; it never changes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolFlags {
    pub active_tool: Option<ToolKind>,
    pub active_menu: MenuKind,
    pub mask_selection_mode: SelectionMode,
    pub click_mode: Option<ClickMode>,
    pub quill_mode: Option<QuillMode>,
    pub is_brush_active: bool,
    /// Brush diameter in image pixels.
    pub brush_size: f64,
    #[serde(with = "color::hex")]
    pub pen_color: SerializableColor,
    /// Spotlight presentation requested by the menu layer.
    pub spotlight: bool,
}

impl Default for ToolFlags {
    fn default() -> Self {
        Self {
            active_tool: None,
            active_menu: MenuKind::Main,
            mask_selection_mode: SelectionMode::Add,
            click_mode: None,
            quill_mode: None,
            is_brush_active: false,
            brush_size: 20.0,
            pen_color: SerializableColor::red(),
            spotlight: false,
        }
    }
}

impl ToolFlags {
    /// Raster brush painting into the mask surface.
    pub fn is_raster_active(&self) -> bool {
        self.is_brush_active || self.active_menu == MenuKind::Assistant
    }

    pub fn effective_brush_size(&self, assistant_size: f64) -> f64 {
        if self.active_menu == MenuKind::Assistant {
            assistant_size
        } else {
            self.brush_size
        }
    }

    pub fn paint_mode(&self) -> PaintMode {
        match (self.active_menu, self.mask_selection_mode) {
            (MenuKind::Assistant, _) | (_, SelectionMode::Add) => PaintMode::Add,
            (_, SelectionMode::Subtract) => PaintMode::Subtract,
        }
    }

    /// Two-finger gestures mean nothing while clicking points.
    pub fn multi_touch_allowed(&self) -> bool {
        self.active_menu != MenuKind::AddSubtract
    }

    pub fn shows_spotlight(&self) -> bool {
        (self.spotlight || self.active_menu == MenuKind::Assistant) && !self.is_raster_active()
    }

    pub fn shows_point_markers(&self) -> bool {
        self.active_menu == MenuKind::AddSubtract
    }

    /// Taps and drags produce point clicks.
    pub fn point_workflow_active(&self) -> bool {
        self.active_menu == MenuKind::AddSubtract && !self.is_raster_active()
    }

    pub fn reports_clicks(&self) -> bool {
        self.click_mode.is_some()
    }
}

/// The single-pointer action currently in flight.
#[derive(Debug, Clone, Default)]
pub enum Interaction {
    #[default]
    Idle,
    /// Raster brush; `checkpoint` restores the mask if the stroke is cancelled.
    Brush {
        last: ImagePoint,
        checkpoint: MaskSurface,
    },
    /// Quill stroke being recorded by the stroke recorder.
    Quill,
    /// Add/subtract point workflow.
    PointTrail { last_emit: Option<Instant> },
    /// Drag-vector tool.
    DragVector { start: ImagePoint, end: ImagePoint },
    /// Floating selection grabbed by the move tool.
    MoveGrab { last: ImagePoint },
    /// Press that reports a point click if it ends without dragging.
    Tap { origin: ImagePoint },
}

impl Interaction {
    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }

    /// Whether enough time has passed since the last emitted trail point.
    pub fn trail_ready(last_emit: Option<Instant>, interval_ms: u64) -> bool {
        last_emit.is_none_or(|t| t.elapsed().as_millis() >= u128::from(interval_ms))
    }

    pub fn now() -> Instant {
        Instant::now()
    }
}
