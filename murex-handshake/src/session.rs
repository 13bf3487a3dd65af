use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::hash::HASH_LEN;
use crate::handshake::Role;

/// A single directed 32-byte session key.
///
/// Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; HASH_LEN]);

impl SessionKey {
    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl core::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// The two directed session keys produced by a completed handshake.
///
/// The initiator encrypts under the initiator-labeled key and decrypts
/// under the responder-labeled key; the responder does the reverse. Each
/// peer's encryption key therefore equals the other peer's decryption key.
pub struct SessionKeys {
    role: Role,
    transcript_hash: [u8; HASH_LEN],
    encryption: SessionKey,
    decryption: SessionKey,
}

impl SessionKeys {
    pub(crate) fn new(
        role: Role,
        transcript_hash: [u8; HASH_LEN],
        initiator_key: [u8; HASH_LEN],
        responder_key: [u8; HASH_LEN],
    ) -> Self {
        let (encryption, decryption) = match role {
            Role::Initiator => (initiator_key, responder_key),
            Role::Responder => (responder_key, initiator_key),
        };
        Self {
            role,
            transcript_hash,
            encryption: SessionKey(encryption),
            decryption: SessionKey(decryption),
        }
    }

    /// The role this side resolved to during the handshake.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The SHA-256 hash of the handshake transcript.
    ///
    /// Both sides hold the same value after a successful handshake; it can
    /// serve as a channel-binding input for application-level checks. It is
    /// derived from the two public keys only and is not secret.
    pub fn transcript_hash(&self) -> &[u8; HASH_LEN] {
        &self.transcript_hash
    }

    /// Key for records this side sends.
    pub fn encryption_key(&self) -> &[u8; HASH_LEN] {
        self.encryption.as_bytes()
    }

    /// Key for records this side receives.
    pub fn decryption_key(&self) -> &[u8; HASH_LEN] {
        self.decryption.as_bytes()
    }

    /// Split into the (encryption, decryption) key pair.
    pub fn into_split(self) -> (SessionKey, SessionKey) {
        (self.encryption, self.decryption)
    }
}

impl core::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("role", &self.role)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}
