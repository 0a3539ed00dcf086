//! Wire-level request and response bodies for the Courier HTTP protocol.
//!
//! Credentials travel only in the authentication body and rely on the TLS
//! channel; they never pass through the message-encryption layer. The
//! session token travels in a header so the server can gate a submit
//! before it looks at the encrypted body.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Route serving the liveness check.
pub const ROUTE_IS_RUNNING: &str = "/is/running";
/// Route accepting credential authentication.
pub const ROUTE_CLIENT_AUTH: &str = "/client/auth";
/// Route accepting encrypted message submissions.
pub const ROUTE_MESSAGE_SUBMIT: &str = "/message/submit";

/// Header carrying the bearer session token on submit requests.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Status code for a submit whose session token is missing, unknown, or
/// expired. Distinct from 401 so the client can tell "re-authenticate and
/// retry" apart from "credentials rejected".
pub const STATUS_AUTH_REQUIRED: u16 = 419;

/// Credential payload for the authentication route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

/// Successful authentication response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Successful submit response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub queued: bool,
}

/// Error body returned on any failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Status reported by the liveness route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerStatus {
    pub active_sessions: usize,
}

/// Wire container for one encrypted message: the ciphertext and the nonce
/// it was sealed with, both base64. The nonce is not secret but any
/// alteration of it fails decryption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub ciphertext: String,
    pub nonce: String,
}

impl Envelope {
    /// Encode raw ciphertext and nonce bytes into a wire envelope.
    pub fn new(ciphertext: &[u8], nonce: &[u8]) -> Self {
        Self {
            ciphertext: general_purpose::STANDARD.encode(ciphertext),
            nonce: general_purpose::STANDARD.encode(nonce),
        }
    }

    /// Decode the envelope back into `(ciphertext, nonce)` bytes.
    pub fn decode(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let ciphertext = general_purpose::STANDARD
            .decode(&self.ciphertext)
            .map_err(|err| Error::protocol(format!("ciphertext is not valid base64: {err}")))?;
        let nonce = general_purpose::STANDARD
            .decode(&self.nonce)
            .map_err(|err| Error::protocol(format!("nonce is not valid base64: {err}")))?;
        Ok((ciphertext, nonce))
    }
}
