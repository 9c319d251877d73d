//! Error types for the chat service
//!
//! Defines application-level errors, outbound send errors and
//! username policy errors. Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors
///
/// Fatal errors end the process (bind, accept, config); the rest end a
/// single connection and are handled by the task that owns it.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be read
    #[error("Failed to read config file '{}': {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid TOML for our layout
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The registry actor has stopped (internal channel broken)
    #[error("Registry closed")]
    RegistryClosed,

    /// Peer closed or failed while choosing a username
    #[error("Client interrupted the username input")]
    HandshakeInterrupted,

    /// Local input reached end of file (client side)
    #[error("Input closed")]
    InputClosed,
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Username policy violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("username must not be empty")]
    Empty,

    #[error("username has {0} characters, at most {max} allowed", max = crate::types::MAX_USERNAME_LEN)]
    TooLong(usize),
}
