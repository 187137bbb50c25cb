//! WhatsApp Cloud API client.
//!
//! Implements both engine boundaries that touch the channel: outbound text
//! delivery and inbound media resolution (download from the Graph API,
//! re-upload to the generation file store).

use crate::config::WhatsAppConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use wicara_ai::FileStore;
use wicara_core::ChatId;
use wicara_engine::{MediaError, MediaResolver, OutboundError, OutboundMessenger, ResolvedMedia};

/// Client for the WhatsApp Cloud API.
pub struct WhatsAppClient {
    http: reqwest::Client,
    config: WhatsAppConfig,
    files: Arc<dyn FileStore>,
}

impl WhatsAppClient {
    /// Creates a client that re-uploads media to the given file store.
    #[must_use]
    pub fn new(config: WhatsAppConfig, files: Arc<dyn FileStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            files,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.config.api_url, self.config.api_version, self.config.phone_number_id
        )
    }
}

/// Media metadata returned by the Graph API.
#[derive(Debug, Deserialize)]
struct MediaInfo {
    url: String,
    mime_type: String,
}

#[async_trait]
impl OutboundMessenger for WhatsAppClient {
    async fn send_text(&self, to: &ChatId, text: &str) -> Result<(), OutboundError> {
        let body = json!({
            "messaging_product": "whatsapp",
            "to": to.as_str(),
            "type": "text",
            "text": {"body": text},
        });
        let response = self
            .http
            .post(self.messages_url())
            .bearer_auth(&self.config.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| OutboundError {
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(OutboundError {
                reason: format!("send returned {status}: {detail}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MediaResolver for WhatsAppClient {
    async fn resolve(&self, media_id: &str) -> Result<ResolvedMedia, MediaError> {
        let info_url = format!(
            "{}/{}/{}",
            self.config.api_url, self.config.api_version, media_id
        );
        let info: MediaInfo = self
            .http
            .get(&info_url)
            .bearer_auth(&self.config.bearer_token)
            .send()
            .await
            .map_err(|e| MediaError {
                reason: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| MediaError {
                reason: format!("malformed media info: {e}"),
            })?;

        let bytes = self
            .http
            .get(&info.url)
            .bearer_auth(&self.config.bearer_token)
            .send()
            .await
            .map_err(|e| MediaError {
                reason: e.to_string(),
            })?
            .bytes()
            .await
            .map_err(|e| MediaError {
                reason: format!("media download failed: {e}"),
            })?;

        let file_uri = self
            .files
            .upload(&bytes, &info.mime_type)
            .await
            .map_err(|e| MediaError {
                reason: e.to_string(),
            })?;
        Ok(ResolvedMedia {
            file_uri,
            mime_type: info.mime_type,
        })
    }
}
