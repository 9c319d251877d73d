//! Client registry actor
//!
//! The single source of truth for who is currently connected. One actor task
//! owns the map and processes commands one at a time, so every mutation and
//! every traversal is serialised without locks. Handlers talk to it through
//! the cloneable `Registry` handle and get answers over oneshot channels.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::client::ClientEntry;
use crate::error::AppError;
use crate::types::{ClientId, Username};

/// Channel buffer size for registry commands
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Commands sent from handlers to the registry actor
#[derive(Debug)]
pub enum RegistryCommand {
    /// Insert an entry; uniqueness is the caller's responsibility
    Add {
        entry: ClientEntry,
        reply: oneshot::Sender<()>,
    },
    /// Insert an entry only if no other connection holds its username
    Admit {
        entry: ClientEntry,
        reply: oneshot::Sender<bool>,
    },
    /// Delete the entry for a connection, if present
    Remove {
        client_id: ClientId,
        reply: oneshot::Sender<Removal>,
    },
    /// Point-in-time copy of all entries
    Snapshot { reply: oneshot::Sender<Snapshot> },
    /// Is the username held by a connection other than `excluding`?
    Contains {
        username: Username,
        excluding: ClientId,
        reply: oneshot::Sender<bool>,
    },
}

/// Outcome of a `Remove` command
#[derive(Debug)]
pub struct Removal {
    /// The removed entry, `None` if the connection was not registered
    pub entry: Option<ClientEntry>,
    /// Number of entries left in the registry
    pub remaining: usize,
}

/// Immutable point-in-time enumeration of registry entries
///
/// Entries are in admission order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<ClientEntry>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientEntry> {
        self.entries.iter()
    }

    /// Every entry except the given connection's
    pub fn others(&self, client_id: ClientId) -> impl Iterator<Item = &ClientEntry> {
        self.entries.iter().filter(move |e| e.id != client_id)
    }

    pub fn contains_client(&self, client_id: ClientId) -> bool {
        self.entries.iter().any(|e| e.id == client_id)
    }
}

/// The registry actor
///
/// Entries are keyed by admission sequence so snapshots come out in join
/// order; `index` maps a connection to its sequence number.
pub struct RegistryActor {
    /// Admission sequence -> entry
    entries: BTreeMap<u64, ClientEntry>,
    /// ClientId -> admission sequence
    index: HashMap<ClientId, u64>,
    /// Next admission sequence number
    next_seq: u64,
    /// Command receiver channel
    receiver: mpsc::Receiver<RegistryCommand>,
}

impl RegistryActor {
    /// Create a new actor with the given command receiver
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>) -> Self {
        Self {
            entries: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
            receiver,
        }
    }

    /// Run the actor event loop
    ///
    /// Continuously receives and processes commands until all handles are dropped.
    pub async fn run(mut self) {
        debug!("Registry started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        debug!("Registry shutting down");
    }

    /// Process a single command
    ///
    /// A dropped reply receiver means the requester went away; that is not
    /// an error for the registry.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Add { entry, reply } => {
                self.insert(entry);
                let _ = reply.send(());
            }
            RegistryCommand::Admit { entry, reply } => {
                let admitted = !self.contains(&entry.username, entry.id);
                if admitted {
                    self.insert(entry);
                } else {
                    info!("The username {} already exist !", entry.username);
                }
                let _ = reply.send(admitted);
            }
            RegistryCommand::Remove { client_id, reply } => {
                let entry = self.remove(client_id);
                let _ = reply.send(Removal {
                    entry,
                    remaining: self.entries.len(),
                });
            }
            RegistryCommand::Snapshot { reply } => {
                let _ = reply.send(Snapshot {
                    entries: self.entries.values().cloned().collect(),
                });
            }
            RegistryCommand::Contains {
                username,
                excluding,
                reply,
            } => {
                let _ = reply.send(self.contains(&username, excluding));
            }
        }
    }

    fn insert(&mut self, entry: ClientEntry) {
        // Re-adding a connection replaces its previous entry
        self.remove(entry.id);

        let seq = self.next_seq;
        self.next_seq += 1;

        debug!("Client {} registered as '{}'", entry.id, entry.username);
        self.index.insert(entry.id, seq);
        self.entries.insert(seq, entry);
        debug!("Total clients: {}", self.entries.len());
    }

    fn remove(&mut self, client_id: ClientId) -> Option<ClientEntry> {
        let seq = self.index.remove(&client_id)?;
        let entry = self.entries.remove(&seq);
        debug!("Client {} unregistered", client_id);
        entry
    }

    fn contains(&self, username: &Username, excluding: ClientId) -> bool {
        self.entries
            .values()
            .any(|e| e.id != excluding && e.username == *username)
    }
}

/// Handle to the registry actor
///
/// Cheap to clone; every clone talks to the same actor.
#[derive(Debug, Clone)]
pub struct Registry {
    cmd_tx: mpsc::Sender<RegistryCommand>,
}

impl Registry {
    /// Spawn a registry actor on the current runtime and return its handle
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        tokio::spawn(RegistryActor::new(cmd_rx).run());
        Self { cmd_tx }
    }

    /// Insert an entry without checking uniqueness
    pub async fn add(&self, entry: ClientEntry) -> Result<(), AppError> {
        self.request(|reply| RegistryCommand::Add { entry, reply })
            .await
    }

    /// Check-and-insert in one step
    ///
    /// Returns false, leaving the registry untouched, if another connection
    /// already holds the username.
    pub async fn admit(&self, entry: ClientEntry) -> Result<bool, AppError> {
        self.request(|reply| RegistryCommand::Admit { entry, reply })
            .await
    }

    /// Remove a connection; a second call for the same connection is a no-op
    pub async fn remove(&self, client_id: ClientId) -> Result<Removal, AppError> {
        self.request(|reply| RegistryCommand::Remove { client_id, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<Snapshot, AppError> {
        self.request(|reply| RegistryCommand::Snapshot { reply })
            .await
    }

    /// True if a connection other than `excluding` holds `username`
    pub async fn contains(
        &self,
        username: &Username,
        excluding: ClientId,
    ) -> Result<bool, AppError> {
        let username = username.clone();
        self.request(|reply| RegistryCommand::Contains {
            username,
            excluding,
            reply,
        })
        .await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T, AppError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| AppError::RegistryClosed)?;
        reply_rx.await.map_err(|_| AppError::RegistryClosed)
    }
}
