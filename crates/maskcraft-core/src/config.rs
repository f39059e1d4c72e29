//! Engine tuning knobs.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// A pixel resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Fixed resolution the remote model servers operate at.
pub const WORKING_RESOLUTION: Resolution = Resolution::new(512, 512);

/// Configuration for an [`Engine`](crate::Engine).
///
/// Every field has a default, so a partial JSON document is enough to
/// override a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Client-space movement (px) that turns a press into a drag.
    pub tap_threshold: f64,
    /// Mask pixels with all RGB channels below this are background.
    pub black_threshold: u8,
    /// Factor applied to pixels outside the spotlighted mask.
    pub spotlight_darken: f32,
    /// Factor applied to pixels inside the spotlighted mask.
    pub spotlight_brighten: f32,
    /// Minimum mask alpha for a pixel to count as spotlighted.
    pub spotlight_alpha_min: u8,
    /// Minimum mask red channel for a pixel to count as spotlighted.
    pub spotlight_red_min: u8,
    /// Opacity of the dark overlay in raster-brush mode.
    pub brush_overlay_alpha: f32,
    /// Opacity of the dimming overlay behind a floating selection.
    pub move_overlay_alpha: f32,
    /// Gray level of the hole left at a floating selection's source.
    pub hole_gray: u8,
    /// Minimum distance (image px) between recorded quill points.
    pub quill_min_spacing: f64,
    /// Radius (image px) within which a tap removes a point marker.
    pub point_remove_radius: f64,
    /// Minimum interval between point clicks emitted while dragging.
    pub drag_point_interval_ms: u64,
    /// Brush size forced while the assistant menu is active.
    pub assistant_brush_size: f64,
    /// Resolution used when preparing masks for remote APIs.
    pub working_resolution: Resolution,
    /// Red level of the black-flattened mask above which a pixel belongs
    /// to a move selection.
    pub selection_threshold: u8,
    /// Red level above which a pixel is greyed out in the move preview's
    /// hole. Lower than `selection_threshold` so soft mask edges are hidden.
    pub hole_threshold: u8,
    /// Upper bound for two-finger zoom.
    pub max_zoom: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tap_threshold: 5.0,
            black_threshold: 20,
            spotlight_darken: 0.5,
            spotlight_brighten: 1.3,
            spotlight_alpha_min: 50,
            spotlight_red_min: 100,
            brush_overlay_alpha: 0.3,
            move_overlay_alpha: 0.5,
            hole_gray: 50,
            quill_min_spacing: 2.0,
            point_remove_radius: 20.0,
            drag_point_interval_ms: 80,
            assistant_brush_size: 40.0,
            working_resolution: WORKING_RESOLUTION,
            selection_threshold: 128,
            hole_threshold: 100,
            max_zoom: 8.0,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    fn validate(&self) -> EngineResult<()> {
        if self.max_zoom < 1.0 {
            return Err(EngineError::Config(format!(
                "max_zoom must be at least 1.0, got {}",
                self.max_zoom
            )));
        }
        if self.working_resolution.width == 0 || self.working_resolution.height == 0 {
            return Err(EngineError::Config("working_resolution must be non-empty".into()));
        }
        if self.tap_threshold < 0.0 || self.quill_min_spacing < 0.0 {
            return Err(EngineError::Config("distances must be non-negative".into()));
        }
        Ok(())
    }
}
