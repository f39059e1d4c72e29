//! Per-frame driver.

use crate::compositor::{FrameImage, PixmapRenderer};
use crate::renderer::{RenderContext, RenderResult, RenderStyle, Renderer};
use maskcraft_core::Engine;

/// Drives a [`Renderer`] once per animation frame.
///
/// Each tick reads a fresh snapshot of the engine and never writes back
/// into it. Until a base image is loaded a tick does nothing.
pub struct RenderLoop<R: Renderer = PixmapRenderer> {
    renderer: R,
    style: RenderStyle,
    last_frame: Option<FrameImage>,
    frame_count: u64,
}

impl RenderLoop<PixmapRenderer> {
    pub fn new(style: RenderStyle) -> Self {
        Self::with_renderer(PixmapRenderer::new(), style)
    }
}

impl Default for RenderLoop<PixmapRenderer> {
    fn default() -> Self {
        Self::new(RenderStyle::default())
    }
}

impl<R: Renderer> RenderLoop<R> {
    pub fn with_renderer(renderer: R, style: RenderStyle) -> Self {
        Self {
            renderer,
            style,
            last_frame: None,
            frame_count: 0,
        }
    }

    /// Render one frame. Returns `None` while no base image is loaded.
    pub fn tick(&mut self, engine: &Engine) -> RenderResult<Option<&FrameImage>> {
        let Some(snapshot) = engine.snapshot() else {
            self.last_frame = None;
            return Ok(None);
        };
        let ctx = RenderContext::new(&snapshot).with_style(self.style.clone());
        let frame = self.renderer.render(&ctx)?;
        self.frame_count += 1;
        if self.frame_count == 1 {
            log::debug!("first frame rendered: {}x{}", frame.width(), frame.height());
        }
        let frame = self.last_frame.insert(frame);
        Ok(Some(&*frame))
    }

    /// Most recently rendered frame.
    pub fn last_frame(&self) -> Option<&FrameImage> {
        self.last_frame.as_ref()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: RenderStyle) {
        self.style = style;
    }
}
