//! Whisper-compatible transcription client.
//!
//! Sends the uploaded bytes unchanged to `POST /audio/transcriptions` and asks for
//! `verbose_json` so segment timestamps come back along with the text.

use super::{endpoint, read_json, ProviderError};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SERVICE: &str = "Transcription API";

/// Audio file as received from the client.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

/// Optional hints forwarded to the API.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionOptions {
    /// ISO 639-1 language code
    pub language: Option<String>,
    /// Vocabulary hint, e.g. genre or instrument names
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<TranscriptSegment>>,
}

#[derive(Debug, Clone)]
pub struct WhisperClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl WhisperClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        model: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn transcribe(
        &self,
        audio: AudioUpload,
        options: TranscriptionOptions,
    ) -> Result<Transcription, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured(SERVICE))?;

        debug!(
            bytes = audio.bytes.len(),
            mime_type = %audio.mime_type,
            model = %self.model,
            "Sending audio for transcription"
        );

        let file = Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(&audio.mime_type)?;

        let mut form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        if let Some(language) = options.language {
            form = form.text("language", language);
        }
        if let Some(prompt) = options.prompt {
            form = form.text("prompt", prompt);
        }

        let response = self
            .http
            .post(endpoint(&self.base_url, "audio/transcriptions"))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        read_json(response).await
    }
}
