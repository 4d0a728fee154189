//! Error types for the Ghostchat core.
//!
//! None of these ever reaches a client as an error frame. They exist so the
//! driver can log why a frame was dropped or a handshake refused.

use thiserror::Error;

/// Failure reported by a store backend.
///
/// The in-memory stores never fail; the variant exists so a persistent or
/// sharded backend can slot in behind the same traits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend could not complete the operation.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Errors from identity issuance and login.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Unknown code or wrong PIN.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Every freshly drawn token was already held by a session.
    #[error("session token collision: randomness source is not producing unique tokens")]
    TokenCollision,

    /// Store failure while reading or writing the identity.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the message router's connection handshake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Missing token, or token that resolves to no identity.
    #[error("unauthorized: session token does not resolve to an identity")]
    Unauthorized,

    /// Store failure while resolving the token.
    #[error(transparent)]
    Store(#[from] StoreError),
}
