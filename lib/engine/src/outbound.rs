//! Channel-side boundaries: message delivery and media resolution.

use async_trait::async_trait;
use std::fmt;
use wicara_core::ChatId;

/// Error returned when an outbound send fails.
#[derive(Debug)]
pub struct OutboundError {
    /// Description of the delivery failure.
    pub reason: String,
}

impl fmt::Display for OutboundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "outbound delivery failed: {}", self.reason)
    }
}

impl std::error::Error for OutboundError {}

/// Error returned when inbound media cannot be resolved.
#[derive(Debug)]
pub struct MediaError {
    /// Description of the resolution failure.
    pub reason: String,
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "media resolution failed: {}", self.reason)
    }
}

impl std::error::Error for MediaError {}

/// Sends messages back to the user on the messaging channel.
#[async_trait]
pub trait OutboundMessenger: Send + Sync {
    /// Sends a plain text message.
    async fn send_text(&self, to: &ChatId, text: &str) -> Result<(), OutboundError>;
}

/// A provider media attachment resolved into a model-readable reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    /// URI the generation backend can read.
    pub file_uri: String,
    /// MIME type of the media.
    pub mime_type: String,
}

/// Turns provider media ids into uploaded file references.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Downloads the provider attachment and re-uploads it for the model.
    async fn resolve(&self, media_id: &str) -> Result<ResolvedMedia, MediaError>;
}
