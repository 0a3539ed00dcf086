//! Server-side session registry.
//!
//! Sessions are keyed by an opaque high-entropy token and expire a fixed
//! lifetime after issue. A username holds at most one live session: a new
//! login supersedes the previous token. Expiry always forces a full
//! re-login; there is no renewal path.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Default session lifetime in seconds (1 hour).
pub const DEFAULT_SESSION_LIFETIME_SECS: i64 = 3600;

/// Session behavior configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long an issued token stays valid.
    pub lifetime: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::seconds(DEFAULT_SESSION_LIFETIME_SECS),
        }
    }
}

/// One authenticated session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a token lookup.
///
/// `Expired` and `NotFound` stay distinct: the caller must tell
/// "must re-login" apart from "never logged in".
#[derive(Debug)]
pub enum Validation {
    Valid(Session),
    Expired,
    NotFound,
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// A freshly generated token matched a live session. Never expected
    /// with 256-bit tokens; the store refuses to overwrite rather than
    /// hand one user another user's session.
    #[error("generated session token collides with a live session")]
    TokenCollision,
}

#[derive(Default)]
struct Inner {
    by_token: HashMap<String, Session>,
    token_by_user: HashMap<String, String>,
}

/// Concurrency-safe token-to-session registry.
///
/// A single lock guards the token map and the per-username index, so
/// session replacement and validation always observe a consistent pair.
pub struct SessionStore {
    lifetime: Duration,
    inner: Mutex<Inner>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            lifetime: config.lifetime,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Issue a session for `username`, superseding any existing one.
    pub fn create(&self, username: &str) -> Result<Session, SessionStoreError> {
        let token = generate_token();
        let now = Utc::now();
        let session = Session {
            token: token.clone(),
            username: username.to_string(),
            issued_at: now,
            expires_at: now + self.lifetime,
        };

        let mut inner = self.lock();
        if inner.by_token.contains_key(&token) {
            return Err(SessionStoreError::TokenCollision);
        }
        if let Some(old_token) = inner
            .token_by_user
            .insert(username.to_string(), token.clone())
        {
            inner.by_token.remove(&old_token);
        }
        inner.by_token.insert(token, session.clone());
        Ok(session)
    }

    /// Look up a token. An expired session is removed as a side effect.
    pub fn validate(&self, token: &str) -> Validation {
        self.validate_at(token, Utc::now())
    }

    fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Validation {
        let mut inner = self.lock();
        let Some(session) = inner.by_token.get(token) else {
            return Validation::NotFound;
        };
        if now < session.expires_at {
            return Validation::Valid(session.clone());
        }

        let username = session.username.clone();
        inner.by_token.remove(token);
        if inner.token_by_user.get(&username).map(String::as_str) == Some(token) {
            inner.token_by_user.remove(&username);
        }
        Validation::Expired
    }

    /// Drop the session for `token`. Returns whether one existed.
    pub fn invalidate(&self, token: &str) -> bool {
        let mut inner = self.lock();
        let Some(session) = inner.by_token.remove(token) else {
            return false;
        };
        if inner.token_by_user.get(&session.username).map(String::as_str) == Some(token) {
            inner.token_by_user.remove(&session.username);
        }
        true
    }

    /// Drop the live session for `username`, if any.
    pub fn invalidate_user(&self, username: &str) -> bool {
        let mut inner = self.lock();
        let Some(token) = inner.token_by_user.remove(username) else {
            return false;
        };
        inner.by_token.remove(&token);
        true
    }

    /// Remove every expired session. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut inner = self.lock();
        let expired: Vec<(String, String)> = inner
            .by_token
            .iter()
            .filter(|(_, session)| now >= session.expires_at)
            .map(|(token, session)| (token.clone(), session.username.clone()))
            .collect();
        for (token, username) in &expired {
            inner.by_token.remove(token);
            if inner.token_by_user.get(username) == Some(token) {
                inner.token_by_user.remove(username);
            }
        }
        expired.len()
    }

    /// Number of sessions currently held (including not-yet-purged
    /// expired ones).
    pub fn active_count(&self) -> usize {
        self.lock().by_token.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Generate a 256-bit random token, hex encoded.
fn generate_token() -> String {
    let mut token_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut token_bytes);
    hex::encode(token_bytes)
}

/// SHA-256 of a token, for log fields. Raw tokens never appear in logs.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_lifetime(lifetime: Duration) -> SessionStore {
        SessionStore::new(SessionConfig { lifetime })
    }

    #[test]
    fn issued_session_has_expected_window() {
        let store = SessionStore::new(SessionConfig::default());
        let session = store.create("alice").unwrap();
        assert_eq!(
            session.expires_at - session.issued_at,
            Duration::seconds(DEFAULT_SESSION_LIFETIME_SECS)
        );
        assert_eq!(session.token.len(), 64);
    }

    #[test]
    fn validate_before_expiry_returns_session() {
        let store = SessionStore::new(SessionConfig::default());
        let session = store.create("alice").unwrap();

        match store.validate(&session.token) {
            Validation::Valid(found) => {
                assert_eq!(found.username, "alice");
                assert_eq!(found.token, session.token);
            }
            other => panic!("expected Valid, got {:?}", other),
        }
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let store = SessionStore::new(SessionConfig::default());
        let session = store.create("alice").unwrap();

        // One step before the boundary: still valid.
        let just_before = session.expires_at - Duration::milliseconds(1);
        assert!(matches!(
            store.validate_at(&session.token, just_before),
            Validation::Valid(_)
        ));

        // Exactly at the boundary: expired and removed.
        assert!(matches!(
            store.validate_at(&session.token, session.expires_at),
            Validation::Expired
        ));

        // The expired session is gone, not merely flagged.
        assert!(matches!(
            store.validate(&session.token),
            Validation::NotFound
        ));
    }

    #[test]
    fn zero_lifetime_session_expires_immediately() {
        let store = store_with_lifetime(Duration::zero());
        let session = store.create("alice").unwrap();
        assert!(matches!(
            store.validate(&session.token),
            Validation::Expired
        ));
    }

    #[test]
    fn second_login_supersedes_first_token() {
        let store = SessionStore::new(SessionConfig::default());
        let first = store.create("alice").unwrap();
        let second = store.create("alice").unwrap();

        assert_ne!(first.token, second.token);
        assert!(matches!(
            store.validate(&first.token),
            Validation::NotFound
        ));
        assert!(matches!(
            store.validate(&second.token),
            Validation::Valid(_)
        ));
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn sessions_for_distinct_users_coexist() {
        let store = SessionStore::new(SessionConfig::default());
        let alice = store.create("alice").unwrap();
        let bob = store.create("bob").unwrap();

        assert!(matches!(store.validate(&alice.token), Validation::Valid(_)));
        assert!(matches!(store.validate(&bob.token), Validation::Valid(_)));
        assert_eq!(store.active_count(), 2);
    }

    #[test]
    fn invalidate_removes_session_and_index() {
        let store = SessionStore::new(SessionConfig::default());
        let session = store.create("alice").unwrap();

        assert!(store.invalidate(&session.token));
        assert!(!store.invalidate(&session.token));
        assert!(matches!(
            store.validate(&session.token),
            Validation::NotFound
        ));
        assert!(!store.invalidate_user("alice"));
    }

    #[test]
    fn invalidate_user_drops_live_token() {
        let store = SessionStore::new(SessionConfig::default());
        let session = store.create("alice").unwrap();

        assert!(store.invalidate_user("alice"));
        assert!(matches!(
            store.validate(&session.token),
            Validation::NotFound
        ));
    }

    #[test]
    fn purge_removes_only_expired_sessions() {
        let expiring = store_with_lifetime(Duration::zero());
        expiring.create("alice").unwrap();
        expiring.create("bob").unwrap();
        assert_eq!(expiring.purge_expired(), 2);
        assert_eq!(expiring.active_count(), 0);

        let fresh = SessionStore::new(SessionConfig::default());
        fresh.create("carol").unwrap();
        assert_eq!(fresh.purge_expired(), 0);
        assert_eq!(fresh.active_count(), 1);
    }

    #[test]
    fn hash_token_never_echoes_input() {
        let token = generate_token();
        let hashed = hash_token(&token);
        assert_ne!(hashed, token);
        assert_eq!(hashed.len(), 64);
    }
}
