//! Courier transport client.
//!
//! Sends encrypted messages to a Courier server, caching the session
//! token and recovering from session expiry with exactly one
//! re-authentication and one retry per send. Every other failure is
//! surfaced to the caller as a typed [`SendError`](client::SendError).

#![forbid(unsafe_code)]

pub mod client;

pub use client::{probe, ClientConfig, SendError, TransportClient};
