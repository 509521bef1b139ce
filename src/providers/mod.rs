//! # External Provider Clients
//!
//! Thin HTTP clients for the third-party APIs this service proxies to:
//! - **xai**: chat completions (music generation), document search, realtime client secrets
//! - **collections**: document uploads into the xAI preferences collection
//! - **whisper**: audio transcription
//!
//! Every call is a single request with no retry. A non-2xx answer becomes
//! [`ProviderError::Status`] and is surfaced to the client as a generic 500.

pub mod collections;
pub mod whisper;
pub mod xai;

pub use collections::CollectionsClient;
pub use whisper::WhisperClient;
pub use xai::XaiClient;

use crate::config::{AppConfig, Credentials};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Provider bodies are logged on failure; keep them from flooding the log.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode provider response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// All provider clients, sharing one connection pool.
#[derive(Debug, Clone)]
pub struct Providers {
    pub xai: XaiClient,
    pub collections: CollectionsClient,
    pub whisper: WhisperClient,
}

impl Providers {
    pub fn new(config: &AppConfig, credentials: &Credentials) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("kre8-backend/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            xai: XaiClient::new(
                http.clone(),
                &config.providers.xai_base_url,
                credentials.xai_api_key.clone(),
            ),
            collections: CollectionsClient::new(
                http.clone(),
                &config.providers.xai_management_url,
                credentials.xai_management_api_key.clone(),
                credentials.preferences_collection_id.clone(),
            ),
            whisper: WhisperClient::new(
                http,
                &config.providers.whisper_base_url,
                credentials.whisper_api_key.clone(),
                &config.providers.transcription_model,
            ),
        })
    }
}

/// Read a provider response, turning non-2xx statuses and bad JSON into errors.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body: truncate(&text, MAX_ERROR_BODY_CHARS),
        });
    }

    serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
