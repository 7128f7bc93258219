//! Detection pipeline errors.

use thiserror::Error;

/// Failure modes of a smart detection request.
///
/// Only `FrameCaptureUnavailable` aborts a request. Every other variant is
/// recorded as the reason a fallback detection was produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    /// The frame source had no frame to hand out
    #[error("Frame capture unavailable: video source is not ready")]
    FrameCaptureUnavailable,

    /// The model runtime could not be loaded
    #[error("Model load failed: {0}")]
    ModelLoadFailure(String),

    /// The model runtime failed while running
    #[error("Inference failed: {0}")]
    InferenceError(String),

    /// No candidate contained or was near the click
    #[error("No object found at click location")]
    NoObjectAtClick,
}
