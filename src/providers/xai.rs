//! xAI API client.
//!
//! Covers the three xAI endpoints the service uses with the plain API key:
//! - `POST /chat/completions` (OpenAI-compatible) for music code generation
//! - `POST /documents/search` for semantic search over the preferences collection
//! - `POST /realtime/client_secrets` for ephemeral realtime voice tokens

use super::{endpoint, read_json, ProviderError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

const SERVICE: &str = "xAI API";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The first choice of a chat completion.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Serialize)]
struct DocumentSearchRequest<'a> {
    query: &'a str,
    source: SearchSource<'a>,
    limit: u32,
}

#[derive(Debug, Clone, Serialize)]
struct SearchSource<'a> {
    collection_ids: [&'a str; 1],
}

#[derive(Debug, Clone, Deserialize)]
struct DocumentSearchResponse {
    #[serde(default)]
    matches: Vec<SearchMatch>,
}

/// One chunk returned by document search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchMatch {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub chunk_content: String,
    #[serde(default)]
    pub score: f64,
    /// Metadata attached to the document at upload time
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
struct ClientSecretRequest {
    expires_after: ExpiresAfter,
}

#[derive(Debug, Clone, Serialize)]
struct ExpiresAfter {
    seconds: u32,
}

/// Ephemeral token for a realtime voice session.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClientSecret {
    pub value: String,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct XaiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl XaiClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::NotConfigured(SERVICE))
    }

    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletion, ProviderError> {
        let api_key = self.api_key()?;
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Requesting chat completion"
        );

        let response = self
            .http
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let body: ChatCompletionResponse = read_json(response).await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Decode("completion contained no message".to_string()))?;

        Ok(ChatCompletion {
            content,
            model: body.model.unwrap_or_else(|| request.model.clone()),
            usage: body.usage,
        })
    }

    pub async fn search_documents(
        &self,
        collection_id: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SearchMatch>, ProviderError> {
        let api_key = self.api_key()?;
        debug!(collection_id = %collection_id, limit, "Searching preferences collection");

        let response = self
            .http
            .post(endpoint(&self.base_url, "documents/search"))
            .bearer_auth(api_key)
            .json(&DocumentSearchRequest {
                query,
                source: SearchSource { collection_ids: [collection_id] },
                limit,
            })
            .send()
            .await?;

        let body: DocumentSearchResponse = read_json(response).await?;
        Ok(body.matches)
    }

    pub async fn create_client_secret(
        &self,
        expires_in_seconds: u32,
    ) -> Result<ClientSecret, ProviderError> {
        let api_key = self.api_key()?;

        let response = self
            .http
            .post(endpoint(&self.base_url, "realtime/client_secrets"))
            .bearer_auth(api_key)
            .json(&ClientSecretRequest {
                expires_after: ExpiresAfter { seconds: expires_in_seconds },
            })
            .send()
            .await?;

        read_json(response).await
    }
}
