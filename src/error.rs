//! # Error Handling
//!
//! This module defines the application error type and how it's converted to HTTP responses.
//!
//! Handlers return `AppResult<HttpResponse>`; anything that goes wrong is turned into a
//! JSON body of the same shape, so the frontend only has to understand one error envelope:
//!
//! ```json
//! {
//!   "success": false,
//!   "error": "Validation failed",
//!   "code": "validation_error",
//!   "details": [{ "field": "prompt", "message": "must be at least 1 character" }],
//!   "timestamp": "2025-01-01T12:00:00Z"
//! }
//! ```
//!
//! Client mistakes map to 400. Everything on the provider side maps to 500 with a generic
//! message; the provider's own error text is logged but never echoed back to the browser.

use crate::providers::ProviderError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// One rejected field from request validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Custom error types for the application.
///
/// ## Error Categories:
/// - **ValidationError**: request body failed schema checks (400, with per-field details)
/// - **BadRequest**: unreadable request, e.g. broken JSON or multipart (400)
/// - **NotFound**: a static config file doesn't exist (404)
/// - **NotConfigured**: the credentials for a provider are missing (500)
/// - **Provider**: the external API call failed (500)
/// - **Internal / ConfigError**: anything else on our side (500)
#[derive(Debug)]
pub enum AppError {
    Internal(String),

    BadRequest(String),

    NotFound(String),

    ConfigError(String),

    ValidationError(Vec<FieldError>),

    /// Name of the service whose credentials are missing
    NotConfigured(&'static str),

    Provider(ProviderError),
}

impl AppError {
    /// Shorthand for a validation failure on a single field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ValidationError(vec![FieldError::new(field, message)])
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::ConfigError(_) => "config_error",
            AppError::ValidationError(_) => "validation_error",
            AppError::NotConfigured(_) => "not_configured",
            AppError::Provider(_) => "provider_error",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(details) => {
                write!(f, "Validation error: ")?;
                for (i, detail) in details.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{} {}", detail.field, detail.message)?;
                }
                Ok(())
            }
            AppError::NotConfigured(service) => write!(f, "{} is not configured", service),
            AppError::Provider(err) => write!(f, "Provider error: {}", err),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts errors into the JSON envelope described at the top of this module.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_)
            | AppError::ConfigError(_)
            | AppError::NotConfigured(_)
            | AppError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (message, details) = match self {
            AppError::ValidationError(details) => {
                ("Validation failed".to_string(), Some(details.clone()))
            }
            AppError::BadRequest(msg) => (msg.clone(), None),
            AppError::NotFound(msg) => (msg.clone(), None),
            AppError::NotConfigured(service) => (format!("{} is not configured", service), None),
            AppError::Provider(err) => {
                tracing::error!(error = %err, "External provider call failed");
                ("External service request failed".to_string(), None)
            }
            AppError::Internal(msg) | AppError::ConfigError(msg) => {
                tracing::error!(error = %msg, "Request failed with internal error");
                ("Internal server error".to_string(), None)
            }
        };

        let mut body = json!({
            "success": false,
            "error": message,
            "code": self.error_type(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing errors are almost always the client's fault, so they become 400s.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(service) => AppError::NotConfigured(service),
            other => AppError::Provider(other),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
