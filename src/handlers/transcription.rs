//! Audio transcription proxy.
//!
//! `POST /api/transcription/transcribe` takes multipart form data:
//! - `audio` (required): the recording, with an `audio/*` content type, at most 25 MB
//! - `language` (optional): ISO 639-1 hint
//! - `prompt` (optional): vocabulary hint for the transcriber
//!
//! The MIME type is checked before any bytes are read, and the size limit is enforced
//! while the upload streams in, so a rejected file is never forwarded or fully buffered.

use crate::error::{AppError, AppResult};
use crate::health::capability_report;
use crate::providers::whisper::{AudioUpload, Transcription, TranscriptionOptions};
use crate::state::AppState;
use crate::validation::{is_audio_mime, Validator, MAX_AUDIO_BYTES};
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde::Serialize;
use serde_json::json;
use tracing::info;

const MAX_TEXT_FIELD_BYTES: usize = 4 * 1024;
const MAX_HINT_PROMPT_CHARS: usize = 1000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptionData {
    #[serde(flatten)]
    transcription: Transcription,
    model: String,
    file_name: String,
    size_bytes: usize,
}

#[derive(Debug, Default)]
struct TranscriptionForm {
    audio: Option<AudioUpload>,
    language: Option<String>,
    prompt: Option<String>,
}

async fn read_audio_field(field: &mut Field, mime_type: String) -> AppResult<AudioUpload> {
    let file_name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .map(str::to_string)
        .unwrap_or_else(|| "audio".to_string());

    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Upload error: {}", e)))?;
        if bytes.len() + chunk.len() > MAX_AUDIO_BYTES {
            return Err(AppError::invalid(
                "audio",
                format!("file too large (max {} MB)", MAX_AUDIO_BYTES / (1024 * 1024)),
            ));
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Err(AppError::invalid("audio", "file is empty"));
    }

    Ok(AudioUpload {
        bytes,
        file_name,
        mime_type,
    })
}

async fn read_text_field(field: &mut Field, name: &str) -> AppResult<String> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Upload error: {}", e)))?;
        if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::invalid(name, "value is too long"));
        }
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes).map_err(|_| AppError::invalid(name, "must be valid UTF-8"))
}

async fn read_form(mut payload: Multipart) -> AppResult<TranscriptionForm> {
    let mut form = TranscriptionForm::default();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "audio" => {
                let mime_type = field.content_type().map(|m| m.to_string()).unwrap_or_default();
                if !is_audio_mime(&mime_type) {
                    let shown = if mime_type.is_empty() { "none" } else { mime_type.as_str() };
                    return Err(AppError::invalid(
                        "audio",
                        format!("must be an audio file (got content type {})", shown),
                    ));
                }
                form.audio = Some(read_audio_field(&mut field, mime_type).await?);
            }
            "language" => form.language = Some(read_text_field(&mut field, "language").await?),
            "prompt" => form.prompt = Some(read_text_field(&mut field, "prompt").await?),
            _ => {
                // Drain fields we don't use so the stream can advance
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| AppError::BadRequest(format!("Upload error: {}", e)))?;
                }
            }
        }
    }

    Ok(form)
}

fn validate_form(form: &TranscriptionForm) -> AppResult<()> {
    let mut v = Validator::new();
    v.check(form.audio.is_some(), "audio", "is required");
    if let Some(language) = form.language.as_deref() {
        v.check(
            (2..=5).contains(&language.len())
                && language.chars().all(|c| c.is_ascii_alphabetic() || c == '-'),
            "language",
            "must be a language code like \"en\" or \"pt-BR\"",
        );
    }
    v.opt_str_len("prompt", form.prompt.as_deref(), 0, MAX_HINT_PROMPT_CHARS);
    v.finish()
}

pub async fn transcribe(
    state: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let form = read_form(payload).await?;
    validate_form(&form)?;

    let audio = form
        .audio
        .ok_or_else(|| AppError::invalid("audio", "is required"))?;
    let file_name = audio.file_name.clone();
    let size_bytes = audio.bytes.len();

    let options = TranscriptionOptions {
        language: form.language.filter(|l| !l.is_empty()),
        prompt: form.prompt.filter(|p| !p.trim().is_empty()),
    };

    let transcription = state.providers.whisper.transcribe(audio, options).await?;
    info!(
        file_name = %file_name,
        size_bytes,
        text_chars = transcription.text.len(),
        "Audio transcribed"
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": TranscriptionData {
            transcription,
            model: state.providers.whisper.model().to_string(),
            file_name,
            size_bytes,
        }
    })))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    capability_report(
        "transcription",
        state.providers.whisper.is_configured(),
        json!({
            "model": state.providers.whisper.model(),
            "maxFileSizeBytes": MAX_AUDIO_BYTES
        }),
    )
}
