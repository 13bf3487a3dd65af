use rand_core::{CryptoRngCore, OsRng};
use subtle::ConstantTimeEq;
use x25519_dalek::EphemeralSecret;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::hash::{self, HASH_LEN};
use crate::crypto::x25519::{self, DH_LEN, SharedSecret};
use crate::error::{CryptoError, HandshakeError};
use crate::psk::PreSharedKey;
use crate::session::SessionKeys;

/// Length of every handshake message in bytes.
///
/// Role nonces, ephemeral public keys, and transcript MACs are all 32
/// bytes, so the driver always reads exactly this much per message.
pub const MESSAGE_LEN: usize = 32;

/// Length of the handshake transcript (both public keys).
const TRANSCRIPT_LEN: usize = 2 * DH_LEN;

/// HKDF info labels for the two directed session keys.
const INFO_INITIATOR_KEY: &[u8] = b"enc";
const INFO_RESPONDER_KEY: &[u8] = b"dec";

/// The side a peer resolved to during the nonce exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// This side drew the lexicographically greater nonce.
    Initiator,
    /// This side drew the lesser nonce.
    Responder,
}

/// The current action the caller must take to advance the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Call `write_message()` and send the result to the peer.
    WriteMessage,
    /// Read [`MESSAGE_LEN`] bytes from the peer and call `read_message()`.
    ReadMessage,
    /// The handshake is complete. Call `into_session()`.
    Complete,
}

/// Internal state tracking which wire step we're on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    SendNonce,
    RecvNonce,
    SendPublic,
    RecvPublic,
    SendMac,
    RecvMac,
    Complete,
}

/// The symmetric handshake state machine.
///
/// Both peers drive the same machine; no client/server role is assigned in
/// advance. Each side first sends a random 32-byte nonce and reads the
/// peer's; the lexicographically greater nonce becomes the
/// [`Role::Initiator`]. The initiator then writes its ephemeral X25519
/// public key before reading, the responder reads before writing, and both
/// derive per-direction session keys from the shared secret via
/// HKDF-SHA-256 salted with the transcript hash.
///
/// With a pre-shared key configured, each side additionally exchanges
/// `HMAC-SHA256(psk, transcript)` after the key exchange (initiator writes
/// first) and verifies the peer's MAC in constant time when the machine is
/// converted into session keys. Both sides must agree on whether a PSK is
/// in use; a one-sided PSK deterministically fails authentication.
///
/// This type performs no I/O. Callers drive it via [`next_action`],
/// [`write_message`], and [`read_message`], then consume it with
/// [`into_session`].
///
/// [`next_action`]: Handshake::next_action
/// [`write_message`]: Handshake::write_message
/// [`read_message`]: Handshake::read_message
/// [`into_session`]: Handshake::into_session
pub struct Handshake {
    phase: Phase,
    role: Option<Role>,
    local_nonce: [u8; MESSAGE_LEN],
    e_secret: Option<EphemeralSecret>,
    e_public: [u8; DH_LEN],
    remote_public: Option<[u8; DH_LEN]>,
    psk: Option<PreSharedKey>,
    transcript_hash: Option<[u8; HASH_LEN]>,
    shared: Option<SharedSecret>,
    local_mac: Option<Zeroizing<[u8; HASH_LEN]>>,
    peer_mac: Option<[u8; HASH_LEN]>,
}

impl Drop for Handshake {
    fn drop(&mut self) {
        self.e_public.zeroize();
        if let Some(ref mut v) = self.remote_public {
            v.zeroize();
        }
    }
}

impl Handshake {
    /// Create a handshake, optionally authenticated by a pre-shared key.
    ///
    /// A PSK shorter than [`PreSharedKey::MIN_LEN`] bytes is rejected here,
    /// before anything reaches the wire.
    pub fn new(psk: Option<PreSharedKey>) -> Result<Self, HandshakeError> {
        Self::new_with_rng(psk, &mut OsRng)
    }

    /// Create a handshake with a specific RNG (useful for testing).
    pub fn new_with_rng(
        psk: Option<PreSharedKey>,
        rng: &mut impl CryptoRngCore,
    ) -> Result<Self, HandshakeError> {
        if let Some(ref psk) = psk {
            if psk.len() < PreSharedKey::MIN_LEN {
                return Err(CryptoError::InvalidKeyMaterial.into());
            }
        }

        let mut local_nonce = [0u8; MESSAGE_LEN];
        rng.fill_bytes(&mut local_nonce);
        let (e_secret, e_public) = x25519::generate_keypair(rng);

        Ok(Self {
            phase: Phase::SendNonce,
            role: None,
            local_nonce,
            e_secret: Some(e_secret),
            e_public,
            remote_public: None,
            psk,
            transcript_hash: None,
            shared: None,
            local_mac: None,
            peer_mac: None,
        })
    }

    /// What action the caller should take next.
    pub fn next_action(&self) -> HandshakeAction {
        match self.phase {
            Phase::SendNonce | Phase::SendPublic | Phase::SendMac => HandshakeAction::WriteMessage,
            Phase::RecvNonce | Phase::RecvPublic | Phase::RecvMac => HandshakeAction::ReadMessage,
            Phase::Complete => HandshakeAction::Complete,
        }
    }

    /// The role this side resolved to, once the nonce exchange has happened.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Whether a pre-shared key authenticates this handshake.
    pub fn is_authenticated(&self) -> bool {
        self.psk.is_some()
    }

    /// Produce the next outbound handshake message.
    pub fn write_message(&mut self) -> Result<[u8; MESSAGE_LEN], HandshakeError> {
        match self.phase {
            Phase::SendNonce => {
                self.phase = Phase::RecvNonce;
                Ok(self.local_nonce)
            }
            Phase::SendPublic => {
                let message = self.e_public;
                match self.role {
                    // The responder already holds the peer's public key, so
                    // sending ours completes the key exchange.
                    Some(Role::Responder) => {
                        self.finalize_key_exchange()?;
                        self.phase = if self.psk.is_some() {
                            Phase::RecvMac
                        } else {
                            Phase::Complete
                        };
                    }
                    Some(Role::Initiator) => self.phase = Phase::RecvPublic,
                    None => return Err(HandshakeError::WrongState),
                }
                Ok(message)
            }
            Phase::SendMac => {
                let mac = self.local_mac.as_ref().ok_or(HandshakeError::WrongState)?;
                let message = **mac;
                self.phase = match self.role {
                    Some(Role::Initiator) => Phase::RecvMac,
                    // The responder replies with its MAC last; verification
                    // happens in into_session() so the reply still reaches
                    // the peer on mismatch.
                    Some(Role::Responder) => Phase::Complete,
                    None => return Err(HandshakeError::WrongState),
                };
                Ok(message)
            }
            _ => Err(HandshakeError::WrongState),
        }
    }

    /// Consume an inbound handshake message.
    pub fn read_message(&mut self, message: &[u8; MESSAGE_LEN]) -> Result<(), HandshakeError> {
        match self.phase {
            Phase::RecvNonce => {
                let role = match self.local_nonce.cmp(message) {
                    core::cmp::Ordering::Greater => Role::Initiator,
                    core::cmp::Ordering::Less => Role::Responder,
                    // Equal nonces would make both sides responders and
                    // deadlock the key exchange; close instead.
                    core::cmp::Ordering::Equal => return Err(HandshakeError::NonceCollision),
                };
                self.role = Some(role);
                self.phase = match role {
                    Role::Initiator => Phase::SendPublic,
                    Role::Responder => Phase::RecvPublic,
                };
                Ok(())
            }
            Phase::RecvPublic => {
                self.remote_public = Some(*message);
                match self.role {
                    Some(Role::Initiator) => {
                        self.finalize_key_exchange()?;
                        self.phase = if self.psk.is_some() {
                            Phase::SendMac
                        } else {
                            Phase::Complete
                        };
                    }
                    Some(Role::Responder) => self.phase = Phase::SendPublic,
                    None => return Err(HandshakeError::WrongState),
                }
                Ok(())
            }
            Phase::RecvMac => {
                self.peer_mac = Some(*message);
                self.phase = match self.role {
                    Some(Role::Initiator) => Phase::Complete,
                    Some(Role::Responder) => Phase::SendMac,
                    None => return Err(HandshakeError::WrongState),
                };
                Ok(())
            }
            _ => Err(HandshakeError::WrongState),
        }
    }

    /// Convert the completed handshake into directed session keys.
    ///
    /// With a PSK configured, the peer's transcript MAC is verified here in
    /// constant time; a mismatch is `CryptoError::Authentication` and the
    /// connection must be torn down.
    pub fn into_session(mut self) -> Result<SessionKeys, HandshakeError> {
        if self.phase != Phase::Complete {
            return Err(HandshakeError::WrongState);
        }

        if self.psk.is_some() {
            let local_mac = self.local_mac.take().ok_or(HandshakeError::WrongState)?;
            let peer_mac = self.peer_mac.take().ok_or(HandshakeError::WrongState)?;
            if !bool::from(local_mac.ct_eq(&peer_mac)) {
                return Err(CryptoError::Authentication.into());
            }
        }

        let role = self.role.ok_or(HandshakeError::WrongState)?;
        let transcript_hash = self.transcript_hash.ok_or(HandshakeError::WrongState)?;
        let shared = self.shared.take().ok_or(HandshakeError::WrongState)?;

        let initiator_key =
            hash::hkdf_sha256(shared.as_bytes(), &transcript_hash, INFO_INITIATOR_KEY)?;
        let responder_key =
            hash::hkdf_sha256(shared.as_bytes(), &transcript_hash, INFO_RESPONDER_KEY)?;

        Ok(SessionKeys::new(
            role,
            transcript_hash,
            initiator_key,
            responder_key,
        ))
    }

    /// Build the canonical transcript, hash it, run ECDH, and (with a PSK)
    /// compute the local transcript MAC.
    ///
    /// Called exactly once, at the point where both public keys are known.
    fn finalize_key_exchange(&mut self) -> Result<(), HandshakeError> {
        let role = self.role.ok_or(HandshakeError::WrongState)?;
        let remote_public = self.remote_public.ok_or(HandshakeError::WrongState)?;
        let e_secret = self.e_secret.take().ok_or(HandshakeError::WrongState)?;

        // Transcript is always initiator_public || responder_public,
        // regardless of which side builds it.
        let mut transcript = [0u8; TRANSCRIPT_LEN];
        match role {
            Role::Initiator => {
                transcript[..DH_LEN].copy_from_slice(&self.e_public);
                transcript[DH_LEN..].copy_from_slice(&remote_public);
            }
            Role::Responder => {
                transcript[..DH_LEN].copy_from_slice(&remote_public);
                transcript[DH_LEN..].copy_from_slice(&self.e_public);
            }
        }

        self.transcript_hash = Some(hash::sha256(&transcript));
        self.shared = Some(x25519::diffie_hellman(e_secret, &remote_public)?);

        if let Some(ref psk) = self.psk {
            self.local_mac = Some(Zeroizing::new(hash::hmac_sha256(
                psk.as_bytes(),
                &transcript,
            )));
        }

        Ok(())
    }
}
