//! Maskcraft Core Library
//!
//! Platform-agnostic engine behind the Maskcraft photo editor canvas: pointer
//! mapping, gesture arbitration, the paintable mask surface, quill strokes and
//! the floating selection used by move edits.

pub mod adjust;
pub mod color;
pub mod config;
pub mod coords;
pub mod engine;
pub mod error;
pub mod events;
pub mod gesture;
pub mod image_buffer;
pub mod input;
pub mod mask;
pub mod polygon;
pub mod raster;
pub mod selection;
pub mod snapshot;
pub mod stroke;
pub mod tools;
pub mod view;

pub use adjust::{AdjustQueue, Adjuster, EditValues};
#[cfg(not(target_arch = "wasm32"))]
pub use adjust::AdjustWorker;
pub use color::SerializableColor;
pub use config::{EngineConfig, Resolution};
pub use coords::{
    ClientPoint, DisplayPoint, ImagePoint, Letterbox, MappedPoint, PixelRect, SurfaceBox,
};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use events::EngineEvent;
pub use gesture::{GestureArbiter, GestureMode, GestureOutcome, PinchSample};
pub use image_buffer::{ImageBuffer, ImageFormat};
pub use input::{PointerEvent, PointerId};
pub use mask::{MaskFile, MaskSurface, PaintMode, WorkingImage};
pub use polygon::{PointLabel, PointMarker, PointSet, Polygon};
pub use selection::{DragEnd, FloatingSelection, SelectionPhase};
pub use snapshot::{FrameSnapshot, RasterBrushView, SpotlightSource, ToolOverlay};
pub use stroke::{Stroke, StrokeIntent, StrokeRecorder};
pub use tools::{ClickMode, Interaction, MenuKind, QuillMode, SelectionMode, ToolFlags, ToolKind};
pub use view::{PinchStep, ViewTransform};
