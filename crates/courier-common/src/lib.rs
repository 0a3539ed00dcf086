//! Shared infrastructure for Courier: wire protocol, message payloads,
//! error types.
//!
//! This crate holds everything the server, client, and CLI agree on: the
//! HTTP route set, the request/response bodies, the encrypted envelope
//! format, and the message payload model.

#![forbid(unsafe_code)]

pub mod error;
pub mod message;
pub mod protocol;

pub use error::{Error, Result};
pub use message::Message;
pub use protocol::*;

/// Initialize tracing with sensible defaults.
///
/// Log level is controlled by the `RUST_LOG` environment variable.
/// Defaults to `info` if not set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Initialize tracing with a specific default level.
pub fn init_tracing_with_default(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
