//! Post-handshake framed encrypted transport.
//!
//! Records on the wire are `len (u32 LE) || nonce (24 bytes) ||
//! ciphertext_with_tag (len bytes)`. Each record carries a fresh random
//! 24-byte XChaCha20 nonce, so the split halves need no shared counter.

use bytes::{BufMut, BytesMut};
use murex_handshake::crypto::aead::{self, NONCE_LEN, TAG_LEN};
use murex_handshake::crypto::rng;
use murex_handshake::{CryptoError, Handshake, PreSharedKey, Role, SessionKey};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tracing::{trace, warn};

use crate::channel::{ChannelReader, ChannelWriter};
use crate::error::{ChannelError, Error, MessageError, Result};
use crate::handshake;

/// Default maximum plaintext size per packet, in bytes.
pub const DEFAULT_MAX_PACKET_SIZE: u32 = 65_536;

const LEN_PREFIX_LEN: usize = 4;

/// Configuration for establishing a [`SecureStream`].
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Maximum plaintext bytes per packet. Must be at least 1.
    pub max_packet_size: u32,

    /// Optional pre-shared key authenticating the peer.
    ///
    /// Both sides MUST agree on whether a PSK is in use. Without one the
    /// peer is unauthenticated and the connection is open to an active
    /// man-in-the-middle; with a one-sided configuration the PSK side
    /// fails with an authentication error rather than desynchronizing
    /// silently.
    pub psk: Option<PreSharedKey>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            psk: None,
        }
    }
}

impl StreamOptions {
    /// Options with a pre-shared key and the default size limit.
    pub fn with_psk(psk: impl Into<PreSharedKey>) -> Self {
        Self {
            psk: Some(psk.into()),
            ..Self::default()
        }
    }
}

/// An established encrypted packet stream over a duplex byte channel.
///
/// Construction performs the full handshake: it returns once both sides
/// have derived session keys (and verified transcript MACs, when a PSK is
/// configured). Use [`split`](SecureStream::split) to drive the two
/// directions from independent tasks.
pub struct SecureStream<S> {
    reader: PacketReader<ReadHalf<S>>,
    writer: PacketWriter<WriteHalf<S>>,
    role: Role,
    transcript_hash: [u8; 32],
}

impl<S: AsyncRead + AsyncWrite + Unpin> SecureStream<S> {
    /// Perform the handshake over `stream` and wrap it.
    ///
    /// Fails with `CryptoError::InvalidKeyMaterial` before any byte is
    /// written if the configured PSK is shorter than
    /// [`PreSharedKey::MIN_LEN`].
    pub async fn new(stream: S, options: StreamOptions) -> Result<Self> {
        if options.max_packet_size == 0 {
            return Err(ChannelError::InvalidOperation(
                "max_packet_size must be at least 1".into(),
            )
            .into());
        }
        let max_packet_size = options.max_packet_size as usize;

        let handshake = Handshake::new(options.psk)?;
        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = ChannelReader::new(read_half);
        let mut writer = ChannelWriter::new(write_half);

        let keys = handshake::drive(&mut reader, &mut writer, handshake).await?;
        let role = keys.role();
        let transcript_hash = *keys.transcript_hash();
        let (encryption, decryption) = keys.into_split();

        Ok(Self {
            reader: PacketReader {
                channel: reader,
                key: decryption,
                max_packet_size,
                closed: false,
            },
            writer: PacketWriter {
                channel: writer,
                key: encryption,
                max_packet_size,
                closed: false,
            },
            role,
            transcript_hash,
        })
    }

    /// The role this side resolved to during the handshake.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The transcript hash shared by both peers (channel binding).
    pub fn transcript_hash(&self) -> &[u8; 32] {
        &self.transcript_hash
    }

    /// Read the next packet. See [`PacketReader::read_packet`].
    pub async fn read_packet(&mut self) -> Result<Vec<u8>> {
        self.reader.read_packet().await
    }

    /// Write a packet. See [`PacketWriter::write_packet`].
    pub async fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.writer.write_packet(packet).await
    }

    /// Split into independently driveable reader and writer halves.
    ///
    /// The halves share only the underlying channel, each owning one
    /// direction and its key. Dropping one half does not close the other.
    pub fn split(self) -> (PacketReader<ReadHalf<S>>, PacketWriter<WriteHalf<S>>) {
        (self.reader, self.writer)
    }
}

/// The receiving half of a [`SecureStream`].
pub struct PacketReader<R> {
    channel: ChannelReader<R>,
    key: SessionKey,
    max_packet_size: usize,
    closed: bool,
}

impl<R: AsyncRead + Unpin> PacketReader<R> {
    /// Read and decrypt the next packet.
    ///
    /// Decryption failures and oversized frames are fatal: the half
    /// latches closed and every later call fails with
    /// `ChannelError::Closed`. Cancelling this future mid-read leaves the
    /// frame boundary unknown; the stream must then be discarded.
    pub async fn read_packet(&mut self) -> Result<Vec<u8>> {
        if self.closed {
            return Err(ChannelError::Closed.into());
        }
        match self.read_frame().await {
            Ok(packet) => Ok(packet),
            Err(error) => {
                if fatal_on_read(&error) {
                    self.closed = true;
                    warn!(%error, "closing stream reader after fatal error");
                }
                Err(error)
            }
        }
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let len = self.channel.read_u32_le().await? as usize;
        let max_frame = self.max_packet_size.saturating_add(TAG_LEN);
        if len == 0 || len > max_frame {
            return Err(MessageError::TooLarge {
                size: len,
                max: max_frame,
            }
            .into());
        }

        let mut nonce = [0u8; NONCE_LEN];
        self.channel.read_exact(&mut nonce).await?;
        let mut ciphertext = vec![0u8; len];
        self.channel.read_exact(&mut ciphertext).await?;

        let packet = aead::open(self.key.as_bytes(), &nonce, &ciphertext)?;
        trace!(len = packet.len(), "packet received");
        Ok(packet)
    }
}

/// The sending half of a [`SecureStream`].
pub struct PacketWriter<W> {
    channel: ChannelWriter<W>,
    key: SessionKey,
    max_packet_size: usize,
    closed: bool,
}

impl<W: AsyncWrite + Unpin> PacketWriter<W> {
    /// Encrypt and write one packet.
    ///
    /// An oversized payload is rejected with `MessageError::TooLarge`
    /// before anything is sent; the writer stays usable. Channel failures
    /// latch the half closed. Cancelling this future mid-write can leave a
    /// partial frame on the wire; the stream must then be discarded.
    pub async fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        if self.closed {
            return Err(ChannelError::Closed.into());
        }
        if packet.len() > self.max_packet_size {
            return Err(MessageError::TooLarge {
                size: packet.len(),
                max: self.max_packet_size,
            }
            .into());
        }

        let nonce: [u8; NONCE_LEN] = rng::random_array();
        let ciphertext = aead::seal(self.key.as_bytes(), &nonce, packet)?;
        let Ok(len) = u32::try_from(ciphertext.len()) else {
            return Err(MessageError::TooLarge {
                size: packet.len(),
                max: self.max_packet_size,
            }
            .into());
        };

        let mut frame = BytesMut::with_capacity(LEN_PREFIX_LEN + NONCE_LEN + ciphertext.len());
        frame.put_u32_le(len);
        frame.put_slice(&nonce);
        frame.put_slice(&ciphertext);

        match self.channel.write_all(&frame).await {
            Ok(()) => {
                trace!(len = packet.len(), "packet sent");
                Ok(())
            }
            Err(error) => {
                self.closed = true;
                warn!(%error, "closing stream writer after channel error");
                Err(error.into())
            }
        }
    }
}

/// Whether a read error destroys the framing (or the channel) for good.
fn fatal_on_read(error: &Error) -> bool {
    matches!(
        error,
        Error::Crypto(CryptoError::Decryption)
            | Error::Message(MessageError::TooLarge { .. })
            | Error::Channel(ChannelError::Closed | ChannelError::Reset | ChannelError::UnexpectedEof)
    )
}
