//! Common error types for Courier.

use thiserror::Error;

/// Result type alias using Courier's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the shared wire-format layer.
///
/// Component-specific failures (crypto, auth, sessions, send) live in
/// their own crates; this type covers only what the common encode/decode
/// paths can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Malformed wire-protocol field
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Create a serialization error from any displayable type.
    pub fn serialization(msg: impl std::fmt::Display) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Create a protocol error from any displayable type.
    pub fn protocol(msg: impl std::fmt::Display) -> Self {
        Self::Protocol(msg.to_string())
    }
}
