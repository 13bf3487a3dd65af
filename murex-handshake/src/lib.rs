#![deny(unsafe_code)]

//! # murex-handshake
//!
//! A pure, sans-IO implementation of the murex symmetric handshake and the
//! wire codec shared by every layer of the transport.
//!
//! Two peers drive the same state machine with no pre-assigned roles: each
//! sends a random 32-byte nonce, the lexicographically greater nonce makes
//! that side the initiator, ephemeral X25519 public keys are exchanged in
//! role order, and HKDF-SHA-256 over the shared secret (salted with the
//! transcript hash) yields one 32-byte session key per direction. An
//! optional pre-shared key authenticates the transcript via HMAC-SHA-256.
//!
//! ## Security Properties
//!
//! - X25519 all-zero shared-secret rejection
//! - All key material zeroized on drop
//! - Constant-time MAC and shared-secret comparisons
//! - No panics on network input
//! - Without a pre-shared key the peer is *unauthenticated*: the exchange
//!   is confidential against passive observers but open to an active
//!   man-in-the-middle
//!
//! This crate performs no I/O; see `murex-tokio` for the async transport
//! built on top of it.

pub mod codec;
pub mod crypto;
pub mod error;

mod handshake;
mod psk;
mod session;

// Re-export the primary public API
pub use error::{CodecError, CryptoError, HandshakeError};
pub use handshake::{Handshake, HandshakeAction, MESSAGE_LEN, Role};
pub use psk::PreSharedKey;
pub use session::{SessionKey, SessionKeys};
