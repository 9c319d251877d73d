//! Multi-user TCP Chat Library
//!
//! A line-oriented chat service over raw TCP built on tokio. The server
//! gives every connection a unique username and relays each line it sends
//! to everybody else; the client drives the same handshake from a terminal.
//!
//! # Features
//! - Username negotiation (`goodUsername` / `badUsername`)
//! - Roster and welcome on admission, join/leave notices
//! - Line relay to every other connected client
//! - Append-only timestamped chat log
//! - Terminal client with concurrent send/receive pumps
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `RegistryActor` owns the table of admitted connections
//! - Each connection has a `handler` task that negotiates, then relays
//! - Each admitted connection has a writer task fed by its own channel
//! - No locks needed - all registry access goes through message passing
//!
//! # Example
//! ```ignore
//! use tcp_chat::{ChatLog, ChatServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = ChatServer::bind("127.0.0.1:3569", ChatLog::new("logs.txt"))
//!         .await
//!         .unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod chat_log;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod negotiator;
pub mod registry;
pub mod relay;
pub mod server;
pub mod terminal;
pub mod types;

// Re-export main types for convenience
pub use chat_log::ChatLog;
pub use client::ClientEntry;
pub use config::{Config, Mode};
pub use error::{AppError, SendError, UsernameError};
pub use handler::handle_connection;
pub use message::{ServerMessage, Verdict};
pub use registry::{Registry, RegistryActor, RegistryCommand, Removal, Snapshot};
pub use relay::Relay;
pub use server::ChatServer;
pub use terminal::{ChatClient, ClientSession};
pub use types::{ClientId, Username};
