#![deny(unsafe_code)]

//! # murex-tokio
//!
//! Integration of the sans-IO [`murex-handshake`] protocol with tokio byte
//! streams, providing a confidential, authenticated, packet-oriented
//! transport over any reliable duplex channel (commonly TCP).
//!
//! This crate provides:
//!
//! - [`SecureStream`] performing the symmetric handshake over any
//!   `AsyncRead + AsyncWrite` stream
//! - [`PacketReader`] / [`PacketWriter`] split halves, driveable from
//!   independent tasks
//! - [`StreamOptions`] carrying the packet size limit and optional
//!   pre-shared key
//! - A layered [`Error`] taxonomy of crypto, message, and channel kinds
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use murex_tokio::{SecureStream, StreamOptions};
//! use tokio::net::TcpStream;
//!
//! # async fn run() -> murex_tokio::Result<()> {
//! let socket = TcpStream::connect("127.0.0.1:4040").await
//!     .map_err(murex_tokio::ChannelError::from)?;
//!
//! let options = StreamOptions::with_psk("c2l4dGVlbi1ieXRlLWtleQ==");
//! let stream = SecureStream::new(socket, options).await?;
//!
//! let (mut reader, mut writer) = stream.split();
//! writer.write_packet(b"ping").await?;
//! let reply = reader.read_packet().await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```
//!
//! ## Security
//!
//! Without a pre-shared key the handshake derives keys from an
//! unauthenticated ephemeral X25519 exchange: it is confidential against
//! passive observers but offers **no protection against an active
//! man-in-the-middle**. Configure the same PSK (at least 16 bytes) on both
//! sides for peer authentication. Both sides must agree on whether a PSK
//! is in use.
//!
//! ## Cancellation
//!
//! Cancelling an in-flight `read_packet` or `write_packet` can leave a
//! partial frame on the channel. A cancelled stream half must be dropped,
//! not retried; re-establish a fresh transport instead.

mod channel;
mod handshake;

pub mod error;
pub mod stream;

pub use error::{ChannelError, Error, MessageError, Result};
pub use stream::{DEFAULT_MAX_PACKET_SIZE, PacketReader, PacketWriter, SecureStream, StreamOptions};

// Re-export the core types callers interact with directly.
pub use murex_handshake::{CodecError, CryptoError, PreSharedKey, Role, codec};
