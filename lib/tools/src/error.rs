//! Error types for tool execution.

use std::fmt;

/// Errors raised by tool handlers.
///
/// The registry converts these into tool-result parts; they never propagate
/// past dispatch.
#[derive(Debug)]
pub enum ToolError {
    /// The arguments were missing, of the wrong type, or inconsistent.
    InvalidArguments {
        /// Description of what was wrong.
        reason: String,
    },
    /// A statement other than `SELECT` was passed to a read-only tool.
    ReadOnlyRequired,
    /// The handler ran but the underlying operation failed.
    ExecutionFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArguments { reason } => write!(f, "invalid tool arguments: {reason}"),
            Self::ReadOnlyRequired => write!(f, "only SELECT statements are allowed"),
            Self::ExecutionFailed { reason } => write!(f, "tool execution failed: {reason}"),
        }
    }
}

impl std::error::Error for ToolError {}
