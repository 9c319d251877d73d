//! Basic type definitions for the chat service
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based identity of one accepted connection
//! - `Username`: a display name that passed the length policy

use uuid::Uuid;

use crate::error::UsernameError;

/// Longest accepted username, in characters
pub const MAX_USERNAME_LEN: usize = 20;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe connection identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated display name
///
/// Between 1 and `MAX_USERNAME_LEN` characters once the line ending has
/// been trimmed. Comparison is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Parse a raw candidate as typed or received, trimming one trailing
    /// `\n` (and a `\r` before it)
    pub fn parse(raw: &str) -> Result<Self, UsernameError> {
        let trimmed = raw.strip_suffix('\n').unwrap_or(raw);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);

        let len = trimmed.chars().count();
        if len == 0 {
            return Err(UsernameError::Empty);
        }
        if len > MAX_USERNAME_LEN {
            return Err(UsernameError::TooLong(len));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_unique() {
        let id1 = ClientId::new();
        let id2 = ClientId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_username_trims_line_ending() {
        assert_eq!(Username::parse("alice\n").unwrap().as_str(), "alice");
        assert_eq!(Username::parse("alice\r\n").unwrap().as_str(), "alice");
        assert_eq!(Username::parse("alice").unwrap().as_str(), "alice");
    }

    #[test]
    fn test_username_only_one_newline_trimmed() {
        // Inner whitespace is part of the name
        assert_eq!(Username::parse(" bob \n").unwrap().as_str(), " bob ");
        assert_eq!(Username::parse("bob\n\n").unwrap().as_str(), "bob\n");
    }

    #[test]
    fn test_username_empty_rejected() {
        assert_eq!(Username::parse(""), Err(UsernameError::Empty));
        assert_eq!(Username::parse("\n"), Err(UsernameError::Empty));
        assert_eq!(Username::parse("\r\n"), Err(UsernameError::Empty));
    }

    #[test]
    fn test_username_length_limit() {
        let twenty = "a".repeat(20);
        assert!(Username::parse(&format!("{twenty}\n")).is_ok());

        let twenty_one = "a".repeat(21);
        assert_eq!(
            Username::parse(&twenty_one),
            Err(UsernameError::TooLong(21))
        );
    }

    #[test]
    fn test_username_counts_characters_not_bytes() {
        let name = "é".repeat(20);
        assert!(Username::parse(&name).is_ok());
    }
}
