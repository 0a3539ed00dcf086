//! The pre-shared symmetric key and its provisioning.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key length in bytes.
pub const KEY_LEN: usize = 32;

/// Key loading and provisioning errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key must be {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    #[error("key is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The shared symmetric key. Identical on both transport ends; zeroed on
/// drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; KEY_LEN]);

impl SharedKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Build a key from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Decode a key from its base64 transport form.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = general_purpose::STANDARD.decode(encoded.trim())?;
        Self::from_bytes(&bytes)
    }

    /// Encode the key to its base64 transport form.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.0)
    }

    /// Load a key from a file written by [`provision_key_file`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let contents = fs::read_to_string(path)?;
        Self::from_base64(&contents)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("SharedKey(..)")
    }
}

/// Outcome of an idempotent provisioning call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// A new key file was written.
    Created,
    /// A key file was already present and was left untouched.
    AlreadyExists,
}

/// Write a fresh key file at `path` unless one already exists.
///
/// Called once at setup time by the provisioning tooling; safe to call
/// again, the existing key is never overwritten.
pub fn provision_key_file(path: impl AsRef<Path>) -> Result<Provisioned, KeyError> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(Provisioned::AlreadyExists);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let key = SharedKey::generate();
    fs::write(path, key.to_base64())?;
    Ok(Provisioned::Created)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        let mut suffix = [0u8; 8];
        OsRng.fill_bytes(&mut suffix);
        std::env::temp_dir().join(format!("courier-{tag}-{}.key", hex::encode(suffix)))
    }

    #[test]
    fn base64_round_trip() {
        let key = SharedKey::generate();
        let decoded = SharedKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key.as_bytes(), decoded.as_bytes());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            SharedKey::from_bytes(&[0u8; 16]),
            Err(KeyError::InvalidLength(16))
        ));
        let short = general_purpose::STANDARD.encode([1u8; 8]);
        assert!(SharedKey::from_base64(&short).is_err());
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(matches!(
            SharedKey::from_base64("!!not-base64!!"),
            Err(KeyError::Encoding(_))
        ));
    }

    #[test]
    fn provisioning_is_idempotent() {
        let path = temp_path("provision");

        assert_eq!(provision_key_file(&path).unwrap(), Provisioned::Created);
        let first = SharedKey::load(&path).unwrap();

        assert_eq!(
            provision_key_file(&path).unwrap(),
            Provisioned::AlreadyExists
        );
        let second = SharedKey::load(&path).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_trims_trailing_whitespace() {
        let path = temp_path("trim");
        let key = SharedKey::generate();
        std::fs::write(&path, format!("{}\n", key.to_base64())).unwrap();

        let loaded = SharedKey::load(&path).unwrap();
        assert_eq!(key.as_bytes(), loaded.as_bytes());

        std::fs::remove_file(&path).unwrap();
    }
}
