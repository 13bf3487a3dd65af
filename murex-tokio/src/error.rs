//! Layered error types for the transport.
//!
//! [`Error`] wraps the three kinds a caller can observe: cryptographic
//! failures from the core, message-level failures (size limits, codec),
//! and channel-level failures (connection state, I/O). Every variant
//! carries a kind suitable for programmatic handling, and no variant ever
//! includes secret material in its message.

use murex_handshake::{CodecError, CryptoError, HandshakeError};
use thiserror::Error;

/// Failures of the underlying byte channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The connection was closed.
    #[error("connection closed")]
    Closed,

    /// The connection was reset by the peer.
    #[error("connection reset by peer")]
    Reset,

    /// The connection was refused.
    #[error("connection refused")]
    Refused,

    /// The operation timed out.
    #[error("operation timed out")]
    TimedOut,

    /// The stream ended in the middle of a frame or handshake message.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The handshake could not be completed.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The operation is not valid in the stream's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Any other I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures at the message/packet level.
#[derive(Debug, Error)]
pub enum MessageError {
    /// A packet or frame exceeded the configured size limit.
    ///
    /// Fatal when raised by a read (the frame boundary is lost); harmless
    /// on a write (nothing was sent).
    #[error("message of {size} bytes exceeds limit of {max} bytes")]
    TooLarge { size: usize, max: usize },

    /// Serializing an outgoing value failed.
    #[error("serialization failed: {0}")]
    Serialization(CodecError),

    /// Deserializing an incoming value failed.
    #[error("deserialization failed: {0}")]
    Deserialization(#[from] CodecError),

    /// The message violated the expected structure.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// Any error surfaced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl From<HandshakeError> for Error {
    fn from(error: HandshakeError) -> Self {
        match error {
            HandshakeError::Crypto(crypto) => Self::Crypto(crypto),
            other => Self::Channel(ChannelError::HandshakeFailed(other.to_string())),
        }
    }
}

impl From<CodecError> for Error {
    fn from(error: CodecError) -> Self {
        Self::Message(MessageError::Deserialization(error))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
