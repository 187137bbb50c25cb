//! Persisted turns and per-conversation control state.

use crate::content::Content;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One persisted exchange in a conversation.
///
/// Either segment may be absent: an admin takeover stores the user segment
/// alone, and a tool round stores a synthetic exchange whose user segment is
/// the tool-result bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Inbound segment, if any.
    pub user: Option<Content>,
    /// Model segment, if any.
    pub bot: Option<Content>,
}

impl Turn {
    /// Creates a turn from its segments.
    #[must_use]
    pub fn new(user: Option<Content>, bot: Option<Content>) -> Self {
        Self { user, bot }
    }
}

/// Who answers inbound messages for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlState {
    /// The model generates replies.
    Bot,
    /// A human operator replies; the model is bypassed.
    Admin,
}

impl ControlState {
    /// Returns the canonical storage token.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`ControlState`] from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseControlStateError {
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for ParseControlStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown control state: {}", self.value)
    }
}

impl std::error::Error for ParseControlStateError {}

impl FromStr for ControlState {
    type Err = ParseControlStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bot" => Ok(Self::Bot),
            "admin" => Ok(Self::Admin),
            other => Err(ParseControlStateError {
                value: other.to_string(),
            }),
        }
    }
}
