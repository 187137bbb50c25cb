//! Identifier types for domain entities.
//!
//! Conversations are keyed by the messaging provider's stable party
//! identifier (a phone number in international format), so `ChatId` wraps an
//! externally assigned string rather than a generated value. Internal,
//! ephemeral entities (one orchestration activation) use ULIDs for
//! uniqueness plus temporal ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing a `ChatId` from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChatIdError {
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseChatIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse chat id: {}", self.reason)
    }
}

impl std::error::Error for ParseChatIdError {}

/// Stable identifier for a conversation.
///
/// This is the messaging provider's party identifier (e.g. `"628111"`),
/// assigned externally and treated as opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    /// Creates a chat id from a provider-assigned identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChatId {
    type Err = ParseChatIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseChatIdError {
                reason: "empty identifier".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<String> for ChatId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for one orchestration-loop activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationId(Ulid);

impl ActivationId {
    /// Creates a new activation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for ActivationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "act_{}", self.0)
    }
}
