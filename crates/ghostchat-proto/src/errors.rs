//! Protocol errors.

use thiserror::Error;

/// Errors raised while decoding or encoding a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The payload is not JSON, or is missing a required field.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The frame could not be serialized.
    #[error("frame encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}
