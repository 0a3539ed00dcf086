//! Server configuration from environment variables.
//!
//! Every knob has a default; malformed values fall back rather than
//! aborting startup. Binaries load a `.env` file before reading these.

use chrono::Duration;
use courier_crypto::{KeyError, SharedKey};

use crate::session::DEFAULT_SESSION_LIFETIME_SECS;

/// Default bind address (loopback; see `COURIER_ALLOW_PUBLIC_BIND`).
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3700";
/// Default sink capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
/// Default shared-key file path.
pub const DEFAULT_KEY_FILE: &str = "courier.key";
/// Default credentials file path.
pub const DEFAULT_CREDENTIALS_FILE: &str = "courier-users.json";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub session_lifetime: Duration,
    pub queue_capacity: usize,
    /// Inline base64 key; takes precedence over `key_file` when set.
    pub key_b64: Option<String>,
    pub key_file: String,
    pub credentials_file: String,
}

impl ServerConfig {
    /// Read configuration from `COURIER_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("COURIER_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            session_lifetime: Duration::seconds(env_i64(
                "COURIER_SESSION_LIFETIME_SECS",
                DEFAULT_SESSION_LIFETIME_SECS,
            )),
            queue_capacity: env_usize("COURIER_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY).max(1),
            key_b64: std::env::var("COURIER_KEY_B64")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            key_file: std::env::var("COURIER_KEY_FILE")
                .unwrap_or_else(|_| DEFAULT_KEY_FILE.to_string()),
            credentials_file: std::env::var("COURIER_CREDENTIALS_FILE")
                .unwrap_or_else(|_| DEFAULT_CREDENTIALS_FILE.to_string()),
        }
    }

    /// Load the pre-shared key this configuration points at.
    pub fn shared_key(&self) -> Result<SharedKey, KeyError> {
        match &self.key_b64 {
            Some(encoded) => SharedKey::from_base64(encoded),
            None => SharedKey::load(&self.key_file),
        }
    }
}

pub fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

pub fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

pub fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}
