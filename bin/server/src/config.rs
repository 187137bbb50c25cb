//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested
//! sections use `__` as the separator, e.g. `WHATSAPP__BEARER_TOKEN`.

use serde::Deserialize;

/// Server configuration composed from section configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// WhatsApp Cloud API configuration.
    pub whatsapp: WhatsAppConfig,

    /// Gemini configuration.
    pub gemini: GeminiConfig,

    /// Engine tunables.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// WhatsApp Cloud API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    /// Phone number id the bot sends from.
    pub phone_number_id: String,

    /// Bearer token for the Cloud API.
    pub bearer_token: String,

    /// Token the webhook verification handshake must present.
    pub verify_token: String,

    /// Graph API version segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Graph API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

/// Gemini settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// API key.
    pub api_key: String,

    /// Model name, e.g. `gemini-2.0-flash`.
    #[serde(default = "default_model")]
    pub model: String,
}

/// Engine tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Standing instruction sent with every generation call.
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// pm2 service name controlled by the service tool.
    #[serde(default = "default_cctv_service")]
    pub cctv_service: String,

    /// Program invoked by the snapshot tool.
    #[serde(default = "default_snapshot_command")]
    pub snapshot_command: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_api_version() -> String {
    "v22.0".to_string()
}

fn default_api_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_system_instruction() -> String {
    "Kamu adalah asisten sekolah yang membantu guru, karyawan, dan orang tua siswa. \
     Jawab dalam bahasa Indonesia yang sopan dan ringkas. Gunakan tools yang tersedia \
     untuk mencari data guru, karyawan, dan siswa sebelum menjawab pertanyaan tentang \
     mereka, dan jangan mengarang data."
        .to_string()
}

fn default_cctv_service() -> String {
    "cctv".to_string()
}

fn default_snapshot_command() -> String {
    "scrot".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            system_instruction: default_system_instruction(),
            cctv_service: default_cctv_service(),
            snapshot_command: default_snapshot_command(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_has_sane_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cctv_service, "cctv");
        assert_eq!(config.snapshot_command, "scrot");
        assert!(config.system_instruction.contains("asisten"));
    }

    #[test]
    fn default_api_targets() {
        assert_eq!(default_api_url(), "https://graph.facebook.com");
        assert_eq!(default_api_version(), "v22.0");
        assert_eq!(default_listen_addr(), "0.0.0.0:3000");
    }
}
