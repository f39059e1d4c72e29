//! Engine error types.

use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Interaction-level conditions such as a stroke cancelled by a pinch are not
/// errors; they are discarded silently.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("No base image loaded")]
    NoImage,
    #[error("Mask has no selected pixels")]
    EmptySelection,
    #[error("Invalid surface size: {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Adjustment worker is not running")]
    WorkerGone,
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
