use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A pre-shared secret used to authenticate the handshake transcript.
///
/// Both peers must either configure the same key or configure none; the
/// minimum accepted length is [`PreSharedKey::MIN_LEN`] bytes, enforced
/// when the handshake is constructed.
///
/// Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PreSharedKey(Vec<u8>);

impl PreSharedKey {
    /// Minimum accepted key length in bytes.
    pub const MIN_LEN: usize = 16;

    /// Create a key from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for PreSharedKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PreSharedKey([REDACTED])")
    }
}

impl From<Vec<u8>> for PreSharedKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for PreSharedKey {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Decode a key from a string: standard base64 is tried first, and on
/// failure the string's raw UTF-8 bytes are used as-is.
///
/// Note that short ASCII strings can themselves be valid base64; supply raw
/// bytes instead of a string when that ambiguity matters.
impl From<&str> for PreSharedKey {
    fn from(value: &str) -> Self {
        match BASE64_STANDARD.decode(value) {
            Ok(decoded) => Self(decoded),
            Err(_) => Self(value.as_bytes().to_vec()),
        }
    }
}

impl From<String> for PreSharedKey {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}
