//! Error types for conversation persistence.

use std::fmt;

/// Errors raised by [`crate::ConversationStore`] implementations.
#[derive(Debug)]
pub enum StoreError {
    /// The backing store failed to execute an operation.
    StorageFailed {
        /// Description of the underlying failure.
        reason: String,
    },
    /// Persisted data could not be decoded into the content model.
    InvalidData {
        /// Description of the malformed data.
        reason: String,
    },
    /// An append was attempted with both segments absent.
    EmptyTurn,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { reason } => {
                write!(f, "conversation storage failed: {reason}")
            }
            Self::InvalidData { reason } => {
                write!(f, "invalid conversation data: {reason}")
            }
            Self::EmptyTurn => write!(f, "refusing to append a turn with no segments"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = StoreError::StorageFailed {
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));
    }
}
