//! Broadcast relay
//!
//! Runs for one admitted connection: announces the arrival, then reads lines
//! and fans them out to everybody else until the connection fails, then
//! unregisters it and tells the others.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::chat_log::ChatLog;
use crate::client::ClientEntry;
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::registry::{Registry, Snapshot};

/// Relay state for one admitted connection
pub struct Relay {
    entry: ClientEntry,
    registry: Registry,
    chat_log: ChatLog,
}

impl Relay {
    pub fn new(entry: ClientEntry, registry: Registry, chat_log: ChatLog) -> Self {
        Self {
            entry,
            registry,
            chat_log,
        }
    }

    /// Announce the admission, then relay until the connection fails
    pub async fn serve<R>(self, reader: &mut R) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
    {
        self.announce().await?;
        self.run(reader).await
    }

    /// Greet the newcomer and tell everyone else
    ///
    /// The roster is only sent when someone else is already connected.
    pub async fn announce(&self) -> Result<(), AppError> {
        let snapshot = self.registry.snapshot().await?;

        if snapshot.len() > 1 {
            self.send_self(ServerMessage::RosterHeader).await;
            for entry in snapshot.iter() {
                self.send_self(ServerMessage::RosterEntry {
                    username: entry.username.clone(),
                })
                .await;
            }
        }
        self.send_self(ServerMessage::Welcome).await;

        self.broadcast(
            &snapshot,
            ServerMessage::Joined {
                username: self.entry.username.clone(),
            },
        )
        .await;

        self.chat_log
            .append(&format!(
                "{} connected from {}",
                self.entry.username, self.entry.addr
            ))
            .await;

        Ok(())
    }

    /// Relay lines until the connection fails, then leave
    ///
    /// EOF, an I/O error and a trailing fragment without newline all end the
    /// loop. Removal and the disconnect notice happen exactly once.
    pub async fn run<R>(self, reader: &mut R) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    debug!("{} closed the connection", self.entry.username);
                    break;
                }
                Ok(_) if buf.last() != Some(&b'\n') => {
                    debug!("{} closed mid-line", self.entry.username);
                    break;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if let Err(e) = self.relay_line(line).await {
                        warn!("Relay for {} stopped: {}", self.entry.username, e);
                        break;
                    }
                }
                Err(e) => {
                    debug!("Read error from {}: {}", self.entry.username, e);
                    break;
                }
            }
        }

        self.leave().await
    }

    async fn relay_line(&self, line: String) -> Result<(), AppError> {
        let msg = ServerMessage::Chat {
            from: self.entry.username.clone(),
            line,
        };
        let text = msg.to_string();

        let snapshot = self.registry.snapshot().await?;
        self.broadcast(&snapshot, msg).await;
        self.chat_log.append(&text).await;

        Ok(())
    }

    async fn leave(&self) -> Result<(), AppError> {
        let removal = self.registry.remove(self.entry.id).await?;
        if removal.entry.is_none() {
            return Ok(());
        }

        let snapshot = self.registry.snapshot().await?;
        self.broadcast(
            &snapshot,
            ServerMessage::Disconnected {
                username: self.entry.username.clone(),
            },
        )
        .await;

        self.chat_log
            .append(&format!(
                "{} is disconnected [total client {}]",
                self.entry.username, removal.remaining
            ))
            .await;

        Ok(())
    }

    /// Best-effort fan-out to everyone in the snapshot except ourselves
    ///
    /// Each send waits for room in the recipient's bounded channel, so a
    /// recipient that stops reading slows every sender down.
    async fn broadcast(&self, snapshot: &Snapshot, msg: ServerMessage) {
        for recipient in snapshot.others(self.entry.id) {
            if let Err(e) = recipient.send(msg.clone()).await {
                debug!("Could not deliver to {}: {}", recipient.username, e);
            }
        }
    }

    async fn send_self(&self, msg: ServerMessage) {
        if let Err(e) = self.entry.send(msg).await {
            debug!("Could not deliver to {}: {}", self.entry.username, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClientId, Username};
    use tokio::sync::mpsc;

    fn entry(name: &str) -> (ClientEntry, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(32);
        let entry = ClientEntry::new(
            ClientId::new(),
            Username::parse(name).unwrap(),
            "127.0.0.1:5000",
            tx,
        );
        (entry, rx)
    }

    fn chat_log(dir: &tempfile::TempDir) -> ChatLog {
        ChatLog::new(dir.path().join("logs.txt"))
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg.to_string());
        }
        out
    }

    #[tokio::test]
    async fn test_announce_alone_skips_roster() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::spawn();
        let (alice, mut rx) = entry("alice");
        registry.add(alice.clone()).await.unwrap();

        Relay::new(alice, registry, chat_log(&dir))
            .announce()
            .await
            .unwrap();

        assert_eq!(drain(&mut rx), vec![ServerMessage::Welcome.to_string()]);
    }

    #[tokio::test]
    async fn test_announce_lists_roster_and_notifies_others() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::spawn();
        let (alice, mut rx_a) = entry("alice");
        let (bob, mut rx_b) = entry("bob");
        registry.add(alice).await.unwrap();
        registry.add(bob.clone()).await.unwrap();

        Relay::new(bob, registry, chat_log(&dir))
            .announce()
            .await
            .unwrap();

        assert_eq!(
            drain(&mut rx_b),
            vec![
                "List of usernames in the server:\n".to_string(),
                "-> alice\n".to_string(),
                "-> bob\n".to_string(),
                ServerMessage::Welcome.to_string(),
            ]
        );
        assert_eq!(drain(&mut rx_a), vec!["[INFO] bob join the server\n"]);

        let log = tokio::fs::read_to_string(dir.path().join("logs.txt"))
            .await
            .unwrap();
        assert!(log.contains("bob connected from 127.0.0.1:5000"));
    }

    #[tokio::test]
    async fn test_run_relays_and_cleans_up_once() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::spawn();
        let (alice, mut rx_a) = entry("alice");
        let (bob, mut rx_b) = entry("bob");
        let alice_id = alice.id;
        registry.add(alice.clone()).await.unwrap();
        registry.add(bob).await.unwrap();

        // Last fragment has no newline: dropped, then treated as EOF
        let mut input: &[u8] = b"hi\nhow are you\npartial";
        Relay::new(alice, registry.clone(), chat_log(&dir))
            .run(&mut input)
            .await
            .unwrap();

        assert_eq!(
            drain(&mut rx_b),
            vec![
                "alice : hi\n",
                "alice : how are you\n",
                "[INFO] alice is now disconnected\n",
            ]
        );
        assert!(drain(&mut rx_a).is_empty());

        let snapshot = registry.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains_client(alice_id));

        let log = tokio::fs::read_to_string(dir.path().join("logs.txt"))
            .await
            .unwrap();
        assert!(log.contains("alice : hi"));
        assert!(log.contains("alice is disconnected [total client 1]"));
    }

    #[tokio::test]
    async fn test_closed_recipient_does_not_stop_relay() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::spawn();
        let (alice, _rx_a) = entry("alice");
        let (bob, rx_b) = entry("bob");
        let (carol, mut rx_c) = entry("carol");
        registry.add(alice.clone()).await.unwrap();
        registry.add(bob).await.unwrap();
        registry.add(carol).await.unwrap();
        drop(rx_b);

        let mut input: &[u8] = b"one\ntwo\n";
        Relay::new(alice, registry, chat_log(&dir))
            .run(&mut input)
            .await
            .unwrap();

        assert_eq!(
            drain(&mut rx_c),
            vec![
                "alice : one\n",
                "alice : two\n",
                "[INFO] alice is now disconnected\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_leave_after_external_removal_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::spawn();
        let (alice, _rx_a) = entry("alice");
        let (bob, mut rx_b) = entry("bob");
        registry.add(alice.clone()).await.unwrap();
        registry.add(bob).await.unwrap();
        registry.remove(alice.id).await.unwrap();

        let mut input: &[u8] = b"";
        Relay::new(alice, registry, chat_log(&dir))
            .run(&mut input)
            .await
            .unwrap();

        assert!(drain(&mut rx_b).is_empty());
    }
}
