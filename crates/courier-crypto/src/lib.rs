//! Cryptographic primitives for Courier.
//!
//! This crate provides:
//! - The pre-shared symmetric key both transport ends are provisioned with
//! - XChaCha20-Poly1305 sealing/opening of message payloads
//! - Idempotent key-file provisioning for setup tooling
//!
//! # Design
//!
//! Every message body is sealed with a freshly random 24-byte nonce that
//! travels alongside the ciphertext. The AEAD tag makes any alteration of
//! ciphertext or nonce a hard decryption failure.
//!
//! Key distribution is out of scope: provisioning writes a key file once,
//! and both processes load the same key out-of-band before the transport
//! starts. Nothing here generates or exchanges keys at request time.

#![forbid(unsafe_code)]

pub mod cipher;
pub mod key;

pub use cipher::{CryptoError, MessageCipher, NONCE_LEN};
pub use key::{provision_key_file, KeyError, Provisioned, SharedKey, KEY_LEN};
