//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! Provider credentials are kept out of the layered config. They are read
//! straight from the process environment (`XAI_API_KEY`, `WHISPER_API_KEY`, ...) into a
//! [`Credentials`] value once at startup, so they never show up in a serialized config.
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `HOST` / `PORT` (deployment platforms)
//! 2. Environment variables (APP_SERVER__HOST, APP_PROVIDERS__XAI_BASE_URL, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration that contains all settings.
///
/// Split into logical groups so each handler only has to care about the part it uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub content: ContentConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where the external providers live and which models they are asked for.
///
/// The base URLs are overridable mostly so tests (and staging setups) can point the
/// service at a mock server instead of the real APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// OpenAI-compatible xAI API root (chat completions, document search, realtime secrets)
    pub xai_base_url: String,
    /// xAI management API root (collection document uploads)
    pub xai_management_url: String,
    /// Whisper-compatible transcription API root
    pub whisper_base_url: String,
    /// Model used for music code generation when the request doesn't name one
    pub generation_model: String,
    /// Model passed to the transcription API
    pub transcription_model: String,
    /// WebSocket URL handed to clients for realtime voice sessions
    pub realtime_url: String,
    /// Timeout applied to every outbound provider request
    pub request_timeout_secs: u64,
}

/// Static content served by the config endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Directory holding defaults.json, models.json, examples.json and sound-catalog.json
    pub config_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            providers: ProvidersConfig {
                xai_base_url: "https://api.x.ai/v1".to_string(),
                xai_management_url: "https://management-api.x.ai/v1".to_string(),
                whisper_base_url: "https://api.openai.com/v1".to_string(),
                generation_model: "grok-4-fast".to_string(),
                transcription_model: "whisper-1".to_string(),
                realtime_url: "wss://api.x.ai/v1/realtime".to_string(),
                request_timeout_secs: 60,
            },
            content: ContentConfig {
                config_dir: "content".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=0.0.0.0`: Override server host
    /// - `APP_PROVIDERS__GENERATION_MODEL=grok-3`: Override the generation model
    /// - `APP_CONTENT__CONFIG_DIR=/srv/kre8/content`: Serve static JSON from elsewhere
    /// - `HOST=0.0.0.0` / `PORT=3000`: Special cases for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // Nested keys contain underscores themselves, so sections are split on "__"
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.providers.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Provider request timeout must be greater than 0"));
        }

        for (name, url) in [
            ("xai_base_url", &self.providers.xai_base_url),
            ("xai_management_url", &self.providers.xai_management_url),
            ("whisper_base_url", &self.providers.whisper_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!("{} must be an http(s) URL, got '{}'", name, url));
            }
        }

        let realtime = &self.providers.realtime_url;
        if !(realtime.starts_with("ws://") || realtime.starts_with("wss://")) {
            return Err(anyhow::anyhow!("realtime_url must be a ws(s) URL, got '{}'", realtime));
        }

        if self.providers.generation_model.trim().is_empty() {
            return Err(anyhow::anyhow!("generation_model cannot be empty"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.providers.request_timeout_secs)
    }

    pub fn config_dir(&self) -> PathBuf {
        PathBuf::from(&self.content.config_dir)
    }
}

/// API keys and collection ids for the external providers.
///
/// Every field is `None` when the corresponding environment variable is unset or blank.
/// Handlers check for presence before calling out; health endpoints report presence.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// `XAI_API_KEY`: generation, document search, realtime client secrets
    pub xai_api_key: Option<String>,
    /// `XAI_MANAGEMENT_API_KEY`: collection uploads
    pub xai_management_api_key: Option<String>,
    /// `XAI_PREFERENCES_COLLECTION_ID`: collection holding user feedback
    pub preferences_collection_id: Option<String>,
    /// `WHISPER_API_KEY`, falling back to `OPENAI_API_KEY`
    pub whisper_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build credentials from an arbitrary key lookup.
    ///
    /// Blank values are treated exactly like missing ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            xai_api_key: get("XAI_API_KEY"),
            xai_management_api_key: get("XAI_MANAGEMENT_API_KEY"),
            preferences_collection_id: get("XAI_PREFERENCES_COLLECTION_ID"),
            whisper_api_key: get("WHISPER_API_KEY").or_else(|| get("OPENAI_API_KEY")),
        }
    }

    pub fn generation_configured(&self) -> bool {
        self.xai_api_key.is_some()
    }

    pub fn transcription_configured(&self) -> bool {
        self.whisper_api_key.is_some()
    }

    pub fn feedback_configured(&self) -> bool {
        self.xai_management_api_key.is_some() && self.preferences_collection_id.is_some()
    }

    pub fn feedback_search_configured(&self) -> bool {
        self.xai_api_key.is_some() && self.preferences_collection_id.is_some()
    }

    pub fn realtime_configured(&self) -> bool {
        self.xai_api_key.is_some()
    }
}
