//! Server error types.

use thiserror::Error;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/network error
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}
