//! Wire text definitions
//!
//! The protocol is raw newline-terminated UTF-8. Handshake verdicts are bare
//! tokens without a newline; everything after admission is one of the
//! `ServerMessage` lines below.

use std::fmt;

use crate::types::Username;

/// Roster header sent before the `-> <username>` lines
pub const ROSTER_HEADER: &str = "List of usernames in the server:\n";

/// Welcome text sent to a newly admitted client
pub const WELCOME: &str = "You can start the discussion with guests ...\n\n";

/// Server's answer to a username candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Username accepted, client admitted
    Good,
    /// Username taken or out of policy, client must retry
    Bad,
}

impl Verdict {
    pub const GOOD_TOKEN: &'static str = "goodUsername";
    pub const BAD_TOKEN: &'static str = "badUsername";

    /// The literal bytes written to the wire (no trailing newline)
    pub fn token(self) -> &'static str {
        match self {
            Verdict::Good => Self::GOOD_TOKEN,
            Verdict::Bad => Self::BAD_TOKEN,
        }
    }
}

/// Server → Client message
///
/// `Display` renders the exact wire text, trailing newline included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Relayed user content; `line` keeps its own trailing newline
    Chat { from: Username, line: String },
    /// Someone was admitted
    Joined { username: Username },
    /// Someone's connection was closed
    Disconnected { username: Username },
    /// Header of the roster listing
    RosterHeader,
    /// One roster line
    RosterEntry { username: Username },
    /// Greeting after admission
    Welcome,
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Chat { from, line } => write!(f, "{} : {}", from, line),
            ServerMessage::Joined { username } => {
                writeln!(f, "[INFO] {} join the server", username)
            }
            ServerMessage::Disconnected { username } => {
                writeln!(f, "[INFO] {} is now disconnected", username)
            }
            ServerMessage::RosterHeader => f.write_str(ROSTER_HEADER),
            ServerMessage::RosterEntry { username } => writeln!(f, "-> {}", username),
            ServerMessage::Welcome => f.write_str(WELCOME),
        }
    }
}
