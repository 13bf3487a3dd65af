//! Adapters turning one half of a duplex byte channel into exact-length
//! reads and whole-buffer writes with typed error mapping.
//!
//! Each adapter owns its half of the split stream, so a direction has
//! exactly one reader or one writer by construction and the halves never
//! race.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ChannelError;

/// Reading half of the byte channel.
pub(crate) struct ChannelReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> ChannelReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Fill `buf` completely, accumulating short reads.
    ///
    /// EOF with nothing read is `Closed`; EOF mid-buffer is
    /// `UnexpectedEof`.
    pub(crate) async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ChannelError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .inner
                .read(&mut buf[filled..])
                .await
                .map_err(map_io_error)?;
            if n == 0 {
                return Err(if filled == 0 {
                    ChannelError::Closed
                } else {
                    ChannelError::UnexpectedEof
                });
            }
            filled += n;
        }
        Ok(())
    }

    /// Read a little-endian `u32`.
    pub(crate) async fn read_u32_le(&mut self) -> Result<u32, ChannelError> {
        let mut bytes = [0u8; 4];
        self.read_exact(&mut bytes).await?;
        Ok(u32::from_le_bytes(bytes))
    }
}

/// Writing half of the byte channel.
pub(crate) struct ChannelWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> ChannelWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write all of `buf`, then flush.
    pub(crate) async fn write_all(&mut self, buf: &[u8]) -> Result<(), ChannelError> {
        self.inner.write_all(buf).await.map_err(map_io_error)?;
        self.inner.flush().await.map_err(map_io_error)
    }
}

/// Map OS-level errors onto the channel error taxonomy.
fn map_io_error(error: io::Error) -> ChannelError {
    match error.kind() {
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => ChannelError::Reset,
        io::ErrorKind::ConnectionRefused => ChannelError::Refused,
        io::ErrorKind::TimedOut => ChannelError::TimedOut,
        io::ErrorKind::BrokenPipe => ChannelError::Closed,
        io::ErrorKind::UnexpectedEof => ChannelError::UnexpectedEof,
        _ => ChannelError::Io(error),
    }
}
