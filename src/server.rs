//! Chat server listener
//!
//! Binds the listening socket, owns the registry handle and chat log, and
//! spawns one session task per accepted connection.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::chat_log::ChatLog;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::registry::Registry;

/// The listening side of the chat service
pub struct ChatServer {
    listener: TcpListener,
    registry: Registry,
    chat_log: ChatLog,
}

impl ChatServer {
    /// Bind the listener and start the registry actor
    pub async fn bind(addr: &str, chat_log: ChatLog) -> Result<Self, AppError> {
        let listener = TcpListener::bind(addr).await?;
        let registry = Registry::spawn();

        Ok(Self {
            listener,
            registry,
            chat_log,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// A handle to the registry this server admits clients into
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    /// Connection accept loop
    ///
    /// Never returns on success. An accept failure is fatal: the error is
    /// returned and the listening socket is released with `self`.
    pub async fn run(self) -> Result<(), AppError> {
        info!("Server is running on {}", self.local_addr()?);

        loop {
            let (stream, addr) = self.listener.accept().await.map_err(|e| {
                error!("Failed to accept connection: {}", e);
                e
            })?;
            info!("New connection from {}", addr);

            let registry = self.registry.clone();
            let chat_log = self.chat_log.clone();

            // Spawn handler task for each connection
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, registry, chat_log).await {
                    error!("Connection handler error for {}: {}", addr, e);
                }
            });
        }
    }
}
