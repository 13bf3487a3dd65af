//! Cryptographic primitives for the handshake and record layer.
//!
//! - [`aead`]: XChaCha20-Poly1305 authenticated encryption
//! - [`hash`]: SHA-256, HMAC-SHA-256, and HKDF-SHA-256
//! - [`rng`]: CSPRNG helpers
//! - [`x25519`]: X25519 Diffie-Hellman with all-zero output rejection

pub mod aead;
pub mod hash;
pub mod rng;
pub mod x25519;
