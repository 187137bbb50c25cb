//! Error types for the orchestration loop.

use std::fmt;
use wicara_ai::GenerationError;
use wicara_conversation::StoreError;

/// Errors that abort one orchestration activation.
#[derive(Debug)]
pub enum EngineError {
    /// The generation backend failed.
    Generation(GenerationError),
    /// The conversation store failed.
    Store(StoreError),
    /// The loop hit the tool-round ceiling without terminating.
    DepthExceeded {
        /// The configured ceiling.
        max: u32,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generation(err) => write!(f, "generation failed: {err}"),
            Self::Store(err) => write!(f, "store operation failed: {err}"),
            Self::DepthExceeded { max } => {
                write!(f, "orchestration exceeded {max} tool rounds")
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Generation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::DepthExceeded { .. } => None,
        }
    }
}

impl From<GenerationError> for EngineError {
    fn from(err: GenerationError) -> Self {
        Self::Generation(err)
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
