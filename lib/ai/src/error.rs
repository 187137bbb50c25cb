//! Error types for the generation boundary.

use std::fmt;

/// Errors raised by generation backends and file stores.
#[derive(Debug)]
pub enum GenerationError {
    /// The HTTP request could not be sent or returned a failure status.
    RequestFailed {
        /// Description of the transport or status failure.
        reason: String,
    },
    /// The response body did not match the expected shape.
    ResponseParseFailed {
        /// Description of the parse failure.
        reason: String,
    },
    /// A media upload failed or never became ready.
    UploadFailed {
        /// Description of the upload failure.
        reason: String,
    },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => write!(f, "generation request failed: {reason}"),
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse generation response: {reason}")
            }
            Self::UploadFailed { reason } => write!(f, "file upload failed: {reason}"),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed {
            reason: err.to_string(),
        }
    }
}
