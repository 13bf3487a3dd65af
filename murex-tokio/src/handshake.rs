//! Async driver for the sans-IO handshake state machine.

use murex_handshake::{Handshake, HandshakeAction, MESSAGE_LEN, SessionKeys};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::channel::{ChannelReader, ChannelWriter};
use crate::error::Result;

/// Run the handshake over the split channel, returning the session keys.
///
/// Each `WriteMessage`/`ReadMessage` step of the machine maps to one
/// exact-length channel operation; the machine itself decides the order.
pub(crate) async fn drive<R, W>(
    reader: &mut ChannelReader<R>,
    writer: &mut ChannelWriter<W>,
    mut handshake: Handshake,
) -> Result<SessionKeys>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    debug!(
        authenticated = handshake.is_authenticated(),
        "starting handshake"
    );

    loop {
        match handshake.next_action() {
            HandshakeAction::WriteMessage => {
                let message = handshake.write_message()?;
                writer.write_all(&message).await?;
            }
            HandshakeAction::ReadMessage => {
                let mut message = [0u8; MESSAGE_LEN];
                reader.read_exact(&mut message).await?;
                handshake.read_message(&message)?;
            }
            HandshakeAction::Complete => {
                let keys = handshake.into_session()?;
                debug!(role = ?keys.role(), "handshake complete");
                return Ok(keys);
            }
        }
    }
}
