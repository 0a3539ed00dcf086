//! Symmetric sealing and opening of message payloads.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

use crate::key::SharedKey;

/// Nonce length in bytes (XChaCha20-Poly1305).
pub const NONCE_LEN: usize = 24;

/// Sealing/opening errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    Encryption,

    /// Authentication mismatch: the ciphertext, nonce, or key is wrong or
    /// has been tampered with.
    #[error("decryption failed: ciphertext rejected")]
    Decryption,

    #[error("nonce must be {NONCE_LEN} bytes, got {0}")]
    InvalidNonceLength(usize),
}

/// Authenticated symmetric cipher over the pre-shared key.
///
/// Each [`encrypt`](MessageCipher::encrypt) call draws a fresh random
/// nonce; the nonce must travel with the ciphertext and be presented
/// unchanged to [`decrypt`](MessageCipher::decrypt) on the other end.
#[derive(Clone)]
pub struct MessageCipher {
    cipher: XChaCha20Poly1305,
}

impl MessageCipher {
    pub fn new(key: &SharedKey) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
        }
    }

    /// Seal a payload, returning the ciphertext and the nonce it was
    /// sealed with.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN]), CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(XNonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| CryptoError::Encryption)?;
        Ok((ciphertext, nonce_bytes))
    }

    /// Open a sealed payload.
    ///
    /// Fails with [`CryptoError::Decryption`] on any authentication
    /// mismatch; a partially decrypted payload is never returned.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::InvalidNonceLength(nonce.len()));
        }
        self.cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decryption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> MessageCipher {
        MessageCipher::new(&SharedKey::generate())
    }

    #[test]
    fn round_trip() {
        let cipher = cipher();
        let plaintext = br#"{"test":1}"#;

        let (ciphertext, nonce) = cipher.encrypt(plaintext).unwrap();
        assert_ne!(&ciphertext, plaintext);

        let opened = cipher.decrypt(&ciphertext, &nonce).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn round_trip_empty_payload() {
        let cipher = cipher();
        let (ciphertext, nonce) = cipher.encrypt(b"").unwrap();
        assert_eq!(cipher.decrypt(&ciphertext, &nonce).unwrap(), b"");
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let cipher = cipher();
        let (ct1, nonce1) = cipher.encrypt(b"repeat").unwrap();
        let (ct2, nonce2) = cipher.encrypt(b"repeat").unwrap();

        assert_ne!(nonce1, nonce2);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let cipher = cipher();
        let (mut ciphertext, nonce) = cipher.encrypt(b"important message").unwrap();

        for index in [0, ciphertext.len() / 2, ciphertext.len() - 1] {
            ciphertext[index] ^= 0x01;
            let result = cipher.decrypt(&ciphertext, &nonce);
            assert!(matches!(result, Err(CryptoError::Decryption)));
            ciphertext[index] ^= 0x01;
        }
    }

    #[test]
    fn tampered_nonce_is_rejected() {
        let cipher = cipher();
        let (ciphertext, mut nonce) = cipher.encrypt(b"important message").unwrap();

        nonce[0] ^= 0x01;
        let result = cipher.decrypt(&ciphertext, &nonce);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let (ciphertext, nonce) = cipher().encrypt(b"for someone else").unwrap();
        let other = cipher();

        let result = other.decrypt(&ciphertext, &nonce);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn wrong_nonce_length_is_rejected() {
        let cipher = cipher();
        let (ciphertext, _) = cipher.encrypt(b"payload").unwrap();

        let result = cipher.decrypt(&ciphertext, &[0u8; 12]);
        assert!(matches!(result, Err(CryptoError::InvalidNonceLength(12))));
    }
}
