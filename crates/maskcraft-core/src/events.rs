//! Events emitted to the host when gestures resolve.

use crate::coords::{DisplayPoint, ImagePoint};
use crate::mask::MaskFile;
use crate::polygon::PointLabel;
use crate::stroke::Stroke;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A point was clicked (tap, throttled drag trail, or a move/drag
    /// press that missed the selection).
    PointClick {
        image: ImagePoint,
        display: DisplayPoint,
    },
    /// A tap landed on an existing marker; `index` is into that label's list.
    PointRemove { kind: PointLabel, index: usize },
    /// Handle and target of a completed move or drag gesture.
    DragEnd { start: ImagePoint, end: ImagePoint },
    /// The committed quill stroke list changed.
    StrokesChanged(Vec<Stroke>),
    /// The raster mask changed and was re-encoded.
    MaskChanged(MaskFile),
    /// Encoding the mask failed; the edit itself was kept.
    MaskRejected { reason: String },
    /// The move tool was entered without any selected pixels.
    NothingToMove,
}
