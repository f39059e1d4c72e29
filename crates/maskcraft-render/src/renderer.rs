//! Renderer trait abstraction.

use crate::compositor::FrameImage;
use maskcraft_core::{EngineConfig, FrameSnapshot};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cannot allocate {width}x{height} surface")]
    SurfaceAlloc { width: u32, height: u32 },
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Colors and blend factors used when compositing a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    /// Multiplier for pixels outside the spotlighted mask.
    pub spotlight_darken: f32,
    /// Multiplier for pixels inside the spotlighted mask.
    pub spotlight_brighten: f32,
    pub spotlight_alpha_min: u8,
    pub spotlight_red_min: u8,
    /// Dark overlay behind the raster brush.
    pub brush_overlay: Color,
    /// Dimming overlay behind a floating selection.
    pub move_overlay: Color,
    pub arrow_color: Color,
    pub cursor_color: Color,
    /// Brush cursor outline width, in frame pixels.
    pub cursor_width: f32,
    /// Half the length of a point marker glyph bar.
    pub marker_radius: f32,
    pub marker_width: f32,
}

impl RenderStyle {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            spotlight_darken: config.spotlight_darken,
            spotlight_brighten: config.spotlight_brighten,
            spotlight_alpha_min: config.spotlight_alpha_min,
            spotlight_red_min: config.spotlight_red_min,
            brush_overlay: Color::from_rgba8(0, 0, 0, alpha_u8(config.brush_overlay_alpha)),
            move_overlay: Color::from_rgba8(0, 0, 0, alpha_u8(config.move_overlay_alpha)),
            arrow_color: Color::from_rgba8(0, 255, 255, 255), // Cyan
            cursor_color: Color::from_rgba8(255, 255, 255, 255),
            cursor_width: 2.0,
            marker_radius: 10.0,
            marker_width: 4.0,
        }
    }
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

fn alpha_u8(alpha: f32) -> u8 {
    (alpha.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// Everything the frame shows, captured after the last input event.
    pub snapshot: &'a FrameSnapshot,
    pub style: RenderStyle,
    /// Skip the tool overlay layer (arrow, floating selection, brush).
    pub hide_overlays: bool,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(snapshot: &'a FrameSnapshot) -> Self {
        Self {
            snapshot,
            style: RenderStyle::default(),
            hide_overlays: false,
        }
    }

    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    /// Render only the static layers (base image, spotlight, strokes, markers).
    pub fn without_overlays(mut self) -> Self {
        self.hide_overlays = true;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Composite one frame. Must not mutate any engine state.
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<FrameImage>;
}
