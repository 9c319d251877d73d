//! Username negotiation
//!
//! Drives the handshake that runs before a connection joins the chat: read a
//! candidate, check it, answer `goodUsername` or `badUsername`, repeat until
//! a name is accepted or the peer goes away.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::ClientEntry;
use crate::error::AppError;
use crate::message::{ServerMessage, Verdict};
use crate::registry::Registry;
use crate::types::{ClientId, Username};

/// Largest candidate read in one go
pub const HANDSHAKE_BUFFER_SIZE: usize = 4096;

/// A connection that has not been admitted yet
#[derive(Debug)]
pub struct PendingClient {
    pub id: ClientId,
    pub addr: String,
    /// Outbound channel the entry will carry once admitted
    pub sender: mpsc::Sender<ServerMessage>,
}

/// Run the handshake to completion
///
/// On success the connection is in the registry and the returned entry is
/// its registration. `AppError::HandshakeInterrupted` means the peer closed
/// or failed first; nothing is left in the registry in that case.
pub async fn negotiate<R, W>(
    reader: &mut R,
    writer: &mut W,
    registry: &Registry,
    pending: PendingClient,
) -> Result<ClientEntry, AppError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; HANDSHAKE_BUFFER_SIZE];

    loop {
        let raw = read_candidate(reader, &mut buf, &pending).await?;

        let verdict = match Username::parse(&raw) {
            Ok(username) => {
                let entry = ClientEntry::new(
                    pending.id,
                    username,
                    pending.addr.clone(),
                    pending.sender.clone(),
                );

                if registry.admit(entry.clone()).await? {
                    if let Err(e) = write_verdict(writer, Verdict::Good).await {
                        debug!("Lost {} while accepting its username: {}", pending.addr, e);
                        registry.remove(pending.id).await?;
                        return Err(AppError::HandshakeInterrupted);
                    }
                    return Ok(entry);
                }
                Verdict::Bad
            }
            Err(e) => {
                debug!("Rejected username candidate from {}: {}", pending.addr, e);
                Verdict::Bad
            }
        };

        if let Err(e) = write_verdict(writer, verdict).await {
            debug!("Lost {} while rejecting its username: {}", pending.addr, e);
            return Err(AppError::HandshakeInterrupted);
        }
    }
}

/// One read is one candidate; no delimiter is assumed
async fn read_candidate<R>(
    reader: &mut R,
    buf: &mut [u8],
    pending: &PendingClient,
) -> Result<String, AppError>
where
    R: AsyncRead + Unpin,
{
    match reader.read(buf).await {
        Ok(0) => {
            debug!("{} closed during username input", pending.addr);
            Err(AppError::HandshakeInterrupted)
        }
        Ok(n) => Ok(String::from_utf8_lossy(&buf[..n]).into_owned()),
        Err(e) => {
            debug!("Read error from {} during username input: {}", pending.addr, e);
            Err(AppError::HandshakeInterrupted)
        }
    }
}

async fn write_verdict<W>(writer: &mut W, verdict: Verdict) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(verdict.token().as_bytes()).await?;
    writer.flush().await
}
