use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use x25519_dalek::{EphemeralSecret, PublicKey as DalekPublicKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// DH output length in bytes (X25519 = 32).
pub const DH_LEN: usize = 32;

/// A shared secret resulting from a Diffie-Hellman operation.
///
/// Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; DH_LEN]);

impl core::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

impl SharedSecret {
    /// Access the raw 32-byte shared secret.
    pub fn as_bytes(&self) -> &[u8; DH_LEN] {
        &self.0
    }
}

/// Generate a fresh ephemeral X25519 keypair.
///
/// Returns (secret, public_key_bytes). The secret is single-use: it is
/// consumed by [`diffie_hellman`].
pub fn generate_keypair(rng: &mut impl CryptoRngCore) -> (EphemeralSecret, [u8; DH_LEN]) {
    let secret = EphemeralSecret::random_from_rng(&mut *rng);
    let public = DalekPublicKey::from(&secret);
    (secret, public.to_bytes())
}

/// Perform DH with an ephemeral secret and a remote public key.
///
/// Returns the 32-byte shared secret, or `CryptoError::KeyExchange` if the
/// result is the all-zeros point (low-order input).
///
/// This check is required by RFC 7748 Section 6.1.
pub fn diffie_hellman(
    secret: EphemeralSecret,
    remote_public: &[u8; DH_LEN],
) -> Result<SharedSecret, CryptoError> {
    let shared = secret.diffie_hellman(&DalekPublicKey::from(*remote_public));
    validate_shared_secret(shared.as_bytes())
}

/// Reject the all-zeros shared secret, which indicates a low-order public key.
fn validate_shared_secret(bytes: &[u8; DH_LEN]) -> Result<SharedSecret, CryptoError> {
    let is_zero = bytes.ct_eq(&[0u8; DH_LEN]);
    if bool::from(is_zero) {
        Err(CryptoError::KeyExchange)
    } else {
        Ok(SharedSecret(*bytes))
    }
}
