//! Registry entry definition
//!
//! Represents an admitted connection: its identity, username, remote
//! address and the channel feeding its writer task.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{ClientId, Username};

/// Admitted client information
///
/// Cloning is cheap; clones share the same outbound channel, so a snapshot
/// of entries can be used for fan-out after the registry has replied.
#[derive(Debug, Clone)]
pub struct ClientEntry {
    /// Identity of the underlying connection
    pub id: ClientId,
    /// Username assigned at admission
    pub username: Username,
    /// Remote address, for logging only
    pub addr: String,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
}

impl ClientEntry {
    /// Create a new entry for the given connection
    pub fn new(
        id: ClientId,
        username: Username,
        addr: impl Into<String>,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            id,
            username,
            addr: addr.into(),
            sender,
        }
    }

    /// Send a message to this client
    ///
    /// Returns an error if the channel is closed (writer task gone).
    pub async fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}
