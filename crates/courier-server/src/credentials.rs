//! Argon2-backed credential verification.
//!
//! Stores only PHC password hashes keyed by username, loadable from a
//! JSON file maintained by the provisioning CLI. Plaintext passwords
//! exist only for the duration of a `verify` or `hash_password` call.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

use crate::auth::CredentialVerifier;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credentials file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Username-to-hash credential set.
#[derive(Debug, Default)]
pub struct ArgonCredentials {
    users: BTreeMap<String, String>,
}

impl ArgonCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a credential set from a JSON file of `{"username": "phc-hash"}`
    /// entries.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialsError> {
        let contents = fs::read_to_string(path)?;
        let users: BTreeMap<String, String> = serde_json::from_str(&contents)?;
        Ok(Self { users })
    }

    /// Write the credential set back out in the `from_file` format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CredentialsError> {
        let contents = serde_json::to_string_pretty(&self.users)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Add or replace the stored hash for `username`.
    pub fn insert(&mut self, username: impl Into<String>, phc_hash: impl Into<String>) {
        self.users.insert(username.into(), phc_hash.into());
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Hash a password into PHC string form for storage.
    pub fn hash_password(password: &str) -> Result<String, CredentialsError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| CredentialsError::Hash(err.to_string()))
    }
}

impl CredentialVerifier for ArgonCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        let Some(stored) = self.users.get(username) else {
            return false;
        };
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
