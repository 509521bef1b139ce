//! Ephemeral realtime voice sessions.
//!
//! The browser never sees the server's API key. It asks for a session here, gets a short-lived
//! client secret back, and opens the realtime websocket to the provider itself.

use crate::error::AppResult;
use crate::health::capability_report;
use crate::state::AppState;
use crate::validation::{validated, Validate, Validator};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::info;

const MIN_EXPIRY_SECS: f64 = 60.0;
const MAX_EXPIRY_SECS: f64 = 600.0;
const DEFAULT_EXPIRY_SECS: u32 = 300;
const MAX_INSTRUCTIONS_CHARS: usize = 4000;

const DEFAULT_INSTRUCTIONS: &str = "You are Kre8, a friendly music co-producer. Listen to what \
the user wants to hear and turn it into music with the generate_music tool. When they ask for \
changes to what is playing, use modify_music and describe the change in plain words. Use \
stop_music when they want silence. Keep spoken replies short and upbeat.";

/// Voices offered by the realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Voice {
    #[default]
    Ara,
    Rex,
    Sal,
    Eve,
    Una,
    Leo,
}

impl Voice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ara => "Ara",
            Self::Rex => "Rex",
            Self::Sal => "Sal",
            Self::Eve => "Eve",
            Self::Una => "Una",
            Self::Leo => "Leo",
        }
    }

    pub fn all() -> &'static [Voice] {
        &[Self::Ara, Self::Rex, Self::Sal, Self::Eve, Self::Una, Self::Leo]
    }
}

impl FromStr for Voice {
    type Err = ();

    /// Case-insensitive; "ARA", "ara" and "Ara" are all `Voice::Ara`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|voice| voice.as_str().eq_ignore_ascii_case(wanted))
            .ok_or(())
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    /// Number so fractional or out-of-range values reach validation
    #[serde(default)]
    pub expires_in_seconds: Option<f64>,
}

impl Validate for SessionRequest {
    fn validate(&self) -> AppResult<()> {
        let mut v = Validator::new();
        if let Some(voice) = self.voice.as_deref() {
            let allowed: Vec<&str> = Voice::all().iter().map(Voice::as_str).collect();
            v.check(
                voice.parse::<Voice>().is_ok(),
                "voice",
                format!("must be one of {}", allowed.join(", ")),
            );
        }
        v.opt_str_len("instructions", self.instructions.as_deref(), 1, MAX_INSTRUCTIONS_CHARS);
        if let Some(expiry) = self.expires_in_seconds {
            v.check(
                expiry.is_finite() && (MIN_EXPIRY_SECS..=MAX_EXPIRY_SECS).contains(&expiry),
                "expiresInSeconds",
                format!("must be between {} and {}", MIN_EXPIRY_SECS, MAX_EXPIRY_SECS),
            );
        }
        v.finish()
    }
}

impl SessionRequest {
    fn voice(&self) -> Voice {
        self.voice
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    fn expiry_secs(&self) -> u32 {
        self.expires_in_seconds
            .map(|secs| secs.round() as u32)
            .unwrap_or(DEFAULT_EXPIRY_SECS)
    }
}

/// Function tools the voice agent may call; the browser executes them.
pub fn session_tools() -> Value {
    json!([
        {
            "type": "function",
            "name": "generate_music",
            "description": "Create a new Strudel pattern from a description of the music the user wants.",
            "parameters": {
                "type": "object",
                "properties": {
                    "prompt": { "type": "string", "description": "What the music should sound like" }
                },
                "required": ["prompt"]
            }
        },
        {
            "type": "function",
            "name": "modify_music",
            "description": "Change the pattern that is currently playing.",
            "parameters": {
                "type": "object",
                "properties": {
                    "instruction": { "type": "string", "description": "The change to make, e.g. \"add hi-hats\"" }
                },
                "required": ["instruction"]
            }
        },
        {
            "type": "function",
            "name": "stop_music",
            "description": "Stop playback.",
            "parameters": { "type": "object", "properties": {} }
        }
    ])
}

/// An empty body means "all defaults".
fn parse_session_request(body: &[u8]) -> AppResult<SessionRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SessionRequest::default());
    }
    Ok(serde_json::from_slice(body)?)
}

pub async fn create_session(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let request = validated(parse_session_request(&body)?)?;
    let voice = request.voice();
    let expiry = request.expiry_secs();
    let instructions = request
        .instructions
        .clone()
        .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());

    let secret = state.providers.xai.create_client_secret(expiry).await?;
    info!(voice = %voice, expires_in_seconds = expiry, "Realtime session token issued");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "client_secret": secret,
        "voice": voice,
        "instructions": instructions,
        "realtime_url": state.config.providers.realtime_url,
        "tools": session_tools(),
        "expires_in_seconds": expiry
    })))
}

pub async fn list_voices() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "voices": Voice::all(),
            "default": Voice::default()
        }
    }))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    capability_report(
        "realtime",
        state.providers.xai.is_configured(),
        json!({ "realtimeUrl": state.config.providers.realtime_url }),
    )
}
