//! TCP connection handler
//!
//! The per-connection session loop: negotiate a username, get admitted,
//! relay until the connection fails, then release everything.

use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat_log::ChatLog;
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::negotiator::{negotiate, PendingClient};
use crate::registry::Registry;
use crate::relay::Relay;
use crate::types::ClientId;

/// Outbound buffer per connection
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Handle a new TCP connection
///
/// Returns once the connection is closed. Handshake interruptions are
/// recorded in the chat log and are not errors.
pub async fn handle_connection(
    stream: TcpStream,
    registry: Registry,
    chat_log: ChatLog,
) -> Result<(), AppError> {
    let addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let client_id = ClientId::new();
    debug!("Client {} connected from {}", client_id, addr);

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    // Create channel for server -> client messages
    let (msg_tx, msg_rx) = mpsc::channel::<ServerMessage>(CHANNEL_BUFFER_SIZE);

    let pending = PendingClient {
        id: client_id,
        addr: addr.clone(),
        sender: msg_tx,
    };

    let entry = match negotiate(&mut reader, &mut write_half, &registry, pending).await {
        Ok(entry) => entry,
        Err(AppError::HandshakeInterrupted) => {
            chat_log
                .append(&format!("Client from {} interrupt the username input", addr))
                .await;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    info!("Client {} admitted as '{}'", client_id, entry.username);

    // Spawn write task (ServerMessage -> socket)
    let write_task = tokio::spawn(write_messages(write_half, msg_rx, addr));

    let result = Relay::new(entry, registry, chat_log)
        .serve(&mut reader)
        .await;

    // The writer ends once the registry and every snapshot have dropped
    // their copies of the sender
    if write_task.await.is_err() {
        warn!("Write task for {} panicked", client_id);
    }
    debug!("Client {} closed", client_id);

    result
}

/// Drain the outbound channel into the socket until either side closes
async fn write_messages<W>(
    mut writer: W,
    mut msg_rx: mpsc::Receiver<ServerMessage>,
    addr: String,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = msg_rx.recv().await {
        if let Err(e) = writer.write_all(msg.to_string().as_bytes()).await {
            warn!("Write to {} failed: {}", addr, e);
            break;
        }
    }
    debug!("Write task ended for {}", addr);

    let _ = writer.shutdown().await;
}
