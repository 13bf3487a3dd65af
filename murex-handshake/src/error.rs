/// Errors surfaced by the cryptographic primitives and the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// The peer's transcript MAC did not match ours (wrong or missing PSK).
    Authentication,
    /// The Diffie-Hellman exchange produced an unusable shared secret.
    KeyExchange,
    /// Supplied key material is unusable (e.g. a pre-shared key below the
    /// minimum length).
    InvalidKeyMaterial,
    /// Session key derivation failed.
    KeyDerivation,
    /// AEAD encryption failed.
    Encryption,
    /// AEAD decryption failed (tag mismatch). Not retryable.
    Decryption,
}

impl core::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Authentication => write!(f, "peer authentication failed"),
            Self::KeyExchange => write!(f, "key exchange failed"),
            Self::InvalidKeyMaterial => write!(f, "invalid key material"),
            Self::KeyDerivation => write!(f, "key derivation failed"),
            Self::Encryption => write!(f, "encryption failed"),
            Self::Decryption => write!(f, "decryption failed"),
        }
    }
}

impl core::error::Error for CryptoError {}

/// Errors that can occur while driving the handshake state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeError {
    /// A cryptographic operation failed during the handshake.
    Crypto(CryptoError),
    /// Both peers drew the same role-resolution nonce. The connection must
    /// be closed; retrying with fresh randomness is the caller's decision.
    NonceCollision,
    /// An operation was attempted in the wrong handshake state.
    WrongState,
}

impl core::fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Crypto(error) => write!(f, "{error}"),
            Self::NonceCollision => write!(f, "role-resolution nonces collided"),
            Self::WrongState => write!(f, "operation not valid in current handshake state"),
        }
    }
}

impl core::error::Error for HandshakeError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Crypto(error) => Some(error),
            _ => None,
        }
    }
}

impl From<CryptoError> for HandshakeError {
    fn from(error: CryptoError) -> Self {
        Self::Crypto(error)
    }
}

/// Errors produced when decoding wire-format values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The input ended before the value was complete.
    UnexpectedEnd,
    /// A string's bytes were not valid UTF-8.
    InvalidUtf8,
    /// An unsupported varint sentinel byte was encountered.
    InvalidVarint(u8),
    /// An option tag was neither 0 nor 1.
    InvalidOptionTag(u8),
    /// A timestamp's fields were outside their valid ranges.
    InvalidTimestamp,
    /// A decoded integer exceeds the range of the target type.
    ValueOutOfRange,
    /// A declared length exceeds what the remaining input could hold.
    LengthOverflow,
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "unexpected end of input"),
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            Self::InvalidVarint(byte) => write!(f, "invalid varint sentinel byte 0x{byte:02x}"),
            Self::InvalidOptionTag(tag) => write!(f, "invalid option tag {tag}"),
            Self::InvalidTimestamp => write!(f, "timestamp out of range"),
            Self::ValueOutOfRange => write!(f, "value out of range for target type"),
            Self::LengthOverflow => write!(f, "declared length exceeds available input"),
        }
    }
}

impl core::error::Error for CodecError {}
