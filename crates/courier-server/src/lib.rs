//! Courier transport server.
//!
//! Receives encrypted messages from authenticated clients over HTTP and
//! hands the decrypted payloads to a consumer sink. Three routes:
//! - `GET /is/running`: liveness, no auth
//! - `POST /client/auth`: credential login, issues a session token
//! - `POST /message/submit`: token-gated encrypted message intake
//!
//! All state (session store, credential verifier, cipher, sink) is owned
//! and injected; lifecycle is bound to the server task, not the process.

#![forbid(unsafe_code)]

pub mod auth;
pub mod config;
pub mod credentials;
pub mod routes;
pub mod session;
pub mod sink;

pub use auth::{AuthError, AuthProtocol, CredentialVerifier};
pub use config::ServerConfig;
pub use credentials::{ArgonCredentials, CredentialsError};
pub use routes::{router, AppState};
pub use session::{Session, SessionConfig, SessionStore, SessionStoreError, Validation};
pub use sink::{ChannelSink, Sink};

/// Serve the Courier routes on an already-bound listener until the task
/// is dropped or the listener fails.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: AppState,
) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}
