//! The sending side of the transport.
//!
//! A send is synchronous from the caller's perspective: it logs in first
//! if no token is cached, submits the encrypted envelope, and on an
//! authentication-required response performs exactly one re-login and one
//! retry. A second authentication-required response is surfaced as an
//! error; nothing in here loops.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::Mutex;

use courier_common::{
    AuthRequest, AuthResponse, Envelope, ErrorResponse, Message, ServerStatus, ROUTE_CLIENT_AUTH,
    ROUTE_IS_RUNNING, ROUTE_MESSAGE_SUBMIT, SESSION_TOKEN_HEADER, STATUS_AUTH_REQUIRED,
};
use courier_crypto::{CryptoError, MessageCipher, SharedKey};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a send (or check) did not succeed.
#[derive(Debug, Error)]
pub enum SendError {
    /// The server rejected the credentials. Not retried.
    #[error("authentication failed: credentials rejected")]
    AuthenticationFailed,

    /// The server still demanded authentication after a successful
    /// re-login. Indicates a deeper fault (clock skew, rotation);
    /// surfaced rather than retried further.
    #[error("authentication still required after re-login")]
    AuthenticationRequired,

    /// The server rejected the envelope as malformed or undecryptable.
    #[error("server rejected the message: {0}")]
    Rejected(String),

    /// The server's queue is full. Retryable by the caller with backoff.
    #[error("server queue is full")]
    Backpressure,

    /// Connection, timeout, or unexpected-response failure.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Encoding(#[from] courier_common::Error),
}

/// Client connection settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Per-request timeout. A timed-out request is a failure; the core
    /// never retries it.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

enum SubmitOutcome {
    Accepted,
    AuthRequired,
}

/// Client for one Courier server, holding the shared key and the cached
/// session token.
///
/// Sends are serialized: the token cache is an async mutex held for the
/// duration of a send, so a re-auth token swap is atomic with respect to
/// any other task sharing this client.
pub struct TransportClient {
    http: reqwest::Client,
    config: ClientConfig,
    cipher: MessageCipher,
    token: Mutex<Option<String>>,
}

impl TransportClient {
    pub fn new(config: ClientConfig, key: &SharedKey) -> Result<Self, SendError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| SendError::TransportUnavailable(err.to_string()))?;
        Ok(Self {
            http,
            config,
            cipher: MessageCipher::new(key),
            token: Mutex::new(None),
        })
    }

    /// Check that the server is up and accepting connections.
    pub async fn connect_check(&self) -> Result<ServerStatus, SendError> {
        check_running(&self.http, &self.config.base_url).await
    }

    /// Log in now and cache the resulting token, replacing any cached one.
    pub async fn authenticate(&self) -> Result<(), SendError> {
        let mut token = self.token.lock().await;
        *token = Some(self.login().await?);
        Ok(())
    }

    /// Encrypt and deliver one message.
    ///
    /// Success means the server's sink accepted the message, exactly
    /// once. An expired session is recovered transparently with one
    /// re-login and one retry of the same envelope.
    pub async fn send(&self, message: &Message) -> Result<(), SendError> {
        let mut token_guard = self.token.lock().await;

        let token = match token_guard.as_ref() {
            Some(token) => token.clone(),
            None => {
                let fresh = self.login().await?;
                *token_guard = Some(fresh.clone());
                fresh
            }
        };

        let payload = message.to_bytes()?;
        let (ciphertext, nonce) = self.cipher.encrypt(&payload)?;
        let envelope = Envelope::new(&ciphertext, &nonce);

        match self.submit(&envelope, &token).await? {
            SubmitOutcome::Accepted => Ok(()),
            SubmitOutcome::AuthRequired => {
                tracing::info!("session no longer accepted, re-authenticating");
                *token_guard = None;
                let fresh = self.login().await?;
                *token_guard = Some(fresh.clone());
                match self.submit(&envelope, &fresh).await? {
                    SubmitOutcome::Accepted => Ok(()),
                    SubmitOutcome::AuthRequired => Err(SendError::AuthenticationRequired),
                }
            }
        }
    }

    async fn login(&self) -> Result<String, SendError> {
        let rsp = self
            .http
            .post(self.url(ROUTE_CLIENT_AUTH))
            .json(&AuthRequest {
                username: self.config.username.clone(),
                password: self.config.password.clone(),
            })
            .send()
            .await
            .map_err(|err| SendError::TransportUnavailable(err.to_string()))?;

        match rsp.status() {
            StatusCode::OK => {
                let body: AuthResponse = rsp
                    .json()
                    .await
                    .map_err(|err| SendError::TransportUnavailable(err.to_string()))?;
                tracing::debug!("authenticated, session valid until {}", body.expires_at);
                Ok(body.token)
            }
            StatusCode::UNAUTHORIZED => Err(SendError::AuthenticationFailed),
            other => Err(SendError::TransportUnavailable(format!(
                "unexpected authentication status {other}"
            ))),
        }
    }

    async fn submit(&self, envelope: &Envelope, token: &str) -> Result<SubmitOutcome, SendError> {
        let rsp = self
            .http
            .post(self.url(ROUTE_MESSAGE_SUBMIT))
            .header(SESSION_TOKEN_HEADER, token)
            .json(envelope)
            .send()
            .await
            .map_err(|err| SendError::TransportUnavailable(err.to_string()))?;

        let status = rsp.status();
        match status.as_u16() {
            200 => Ok(SubmitOutcome::Accepted),
            STATUS_AUTH_REQUIRED => Ok(SubmitOutcome::AuthRequired),
            400 => Err(SendError::Rejected(error_body(rsp).await)),
            401 => Err(SendError::AuthenticationFailed),
            503 => Err(SendError::Backpressure),
            _ => Err(SendError::TransportUnavailable(format!(
                "unexpected submit status {status}"
            ))),
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.config.base_url, route)
    }
}

/// One-off liveness probe without constructing a full client.
pub async fn probe(base_url: &str, timeout: Duration) -> Result<ServerStatus, SendError> {
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| SendError::TransportUnavailable(err.to_string()))?;
    check_running(&http, base_url.trim_end_matches('/')).await
}

async fn check_running(
    http: &reqwest::Client,
    base_url: &str,
) -> Result<ServerStatus, SendError> {
    let rsp = http
        .get(format!("{base_url}{ROUTE_IS_RUNNING}"))
        .send()
        .await
        .map_err(|err| SendError::TransportUnavailable(err.to_string()))?;

    if rsp.status() != StatusCode::OK {
        return Err(SendError::TransportUnavailable(format!(
            "liveness check returned {}",
            rsp.status()
        )));
    }
    rsp.json()
        .await
        .map_err(|err| SendError::TransportUnavailable(err.to_string()))
}

async fn error_body(rsp: reqwest::Response) -> String {
    rsp.json::<ErrorResponse>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| "request rejected".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = ClientConfig::new("http://127.0.0.1:3700/", "alice", "pw");
        assert_eq!(config.base_url, "http://127.0.0.1:3700");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn url_joins_routes_onto_base() {
        let config = ClientConfig::new("http://127.0.0.1:3700", "alice", "pw");
        let client = TransportClient::new(config, &SharedKey::generate()).unwrap();
        assert_eq!(
            client.url(ROUTE_MESSAGE_SUBMIT),
            "http://127.0.0.1:3700/message/submit"
        );
    }
}
