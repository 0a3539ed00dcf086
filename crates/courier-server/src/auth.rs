//! Login and request authorization.
//!
//! Credential verification is delegated: the server consumes a
//! [`CredentialVerifier`] and never sees how credentials are stored. The
//! bundled argon2-backed implementation lives in
//! [`credentials`](crate::credentials).

use std::sync::Arc;

use thiserror::Error;

use crate::session::{Session, SessionStore, SessionStoreError, Validation};

/// Validates a username/password pair against the credential source.
///
/// `Send + Sync` so one verifier can serve concurrent requests.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Constant-shape login failure. Does not reveal whether the username
    /// exists.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No session for the presented token.
    #[error("not authenticated")]
    Unauthenticated,

    /// The session existed and has expired; a full re-login is required.
    #[error("session expired")]
    SessionExpired,

    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

/// Orchestrates login and request gating over a verifier and a session
/// store.
pub struct AuthProtocol {
    verifier: Arc<dyn CredentialVerifier>,
    store: Arc<SessionStore>,
}

impl AuthProtocol {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, store: Arc<SessionStore>) -> Self {
        Self { verifier, store }
    }

    /// Verify credentials and issue a session, superseding any prior
    /// session for the same username.
    pub fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        if !self.verifier.verify(username, password) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(self.store.create(username)?)
    }

    /// Gate a request on its session token.
    pub fn authorize(&self, token: &str) -> Result<Session, AuthError> {
        match self.store.validate(token) {
            Validation::Valid(session) => Ok(session),
            Validation::Expired => Err(AuthError::SessionExpired),
            Validation::NotFound => Err(AuthError::Unauthenticated),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use chrono::Duration;

    struct FixedVerifier {
        username: &'static str,
        password: &'static str,
    }

    impl CredentialVerifier for FixedVerifier {
        fn verify(&self, username: &str, password: &str) -> bool {
            username == self.username && password == self.password
        }
    }

    fn protocol_with_lifetime(lifetime: Duration) -> AuthProtocol {
        AuthProtocol::new(
            Arc::new(FixedVerifier {
                username: "alice",
                password: "open sesame",
            }),
            Arc::new(SessionStore::new(SessionConfig { lifetime })),
        )
    }

    fn protocol() -> AuthProtocol {
        protocol_with_lifetime(SessionConfig::default().lifetime)
    }

    #[test]
    fn login_issues_session_for_valid_credentials() {
        let auth = protocol();
        let session = auth.login("alice", "open sesame").unwrap();
        assert_eq!(session.username, "alice");
        assert!(auth.authorize(&session.token).is_ok());
    }

    #[test]
    fn login_failure_shape_is_constant() {
        let auth = protocol();
        let wrong_password = auth.login("alice", "wrong").unwrap_err();
        let unknown_user = auth.login("mallory", "open sesame").unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
    }

    #[test]
    fn authorize_maps_missing_token_to_unauthenticated() {
        let auth = protocol();
        assert!(matches!(
            auth.authorize("no-such-token"),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn authorize_maps_expired_session_to_session_expired() {
        let auth = protocol_with_lifetime(Duration::zero());
        let session = auth.login("alice", "open sesame").unwrap();

        assert!(matches!(
            auth.authorize(&session.token),
            Err(AuthError::SessionExpired)
        ));
        // The expired session was removed; a second probe is
        // indistinguishable from never having logged in.
        assert!(matches!(
            auth.authorize(&session.token),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn expiry_requires_full_relogin() {
        let auth = protocol_with_lifetime(Duration::zero());
        let stale = auth.login("alice", "open sesame").unwrap();
        assert!(auth.authorize(&stale.token).is_err());

        let fresh = auth.login("alice", "open sesame").unwrap();
        assert_ne!(stale.token, fresh.token);
    }
}
