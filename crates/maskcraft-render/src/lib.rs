//! Maskcraft Render Library
//!
//! Turns engine frame snapshots into pixels. The default implementation
//! composites on the CPU with tiny-skia.

mod compositor;
mod frame_loop;
mod renderer;

pub use compositor::{ArrowMetrics, FrameImage, PixmapRenderer, render_snapshot};
pub use frame_loop::RenderLoop;
pub use renderer::{RenderContext, RenderError, RenderResult, RenderStyle, Renderer};
