//! Request validation.
//!
//! Every JSON body is deserialized into a plain request struct and then run through its
//! [`Validate`] impl before a handler touches any provider. All failing fields are
//! collected so the client gets the complete list in one 400 response.

use crate::error::{AppError, AppResult, FieldError};
use std::fmt::Display;

/// Longest prompt accepted by the generation endpoint, in characters.
pub const MAX_PROMPT_CHARS: usize = 10_000;

/// Largest audio upload forwarded to the transcription API (25 MB).
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

pub trait Validate {
    fn validate(&self) -> AppResult<()>;
}

/// Run validation and hand the value back, so handlers can write
/// `let request = validated(body.into_inner())?;`.
pub fn validated<T: Validate>(value: T) -> AppResult<T> {
    value.validate()?;
    Ok(value)
}

/// Accumulates field errors while a request is checked.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.fail(field, message);
        }
    }

    /// Length is counted in characters, not bytes.
    pub fn str_len(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.fail(field, format!("must be at least {} character(s)", min));
        } else if len > max {
            self.fail(field, format!("must be at most {} characters", max));
        }
    }

    pub fn opt_str_len(&mut self, field: &str, value: Option<&str>, min: usize, max: usize) {
        if let Some(value) = value {
            self.str_len(field, value, min, max);
        }
    }

    pub fn range<T>(&mut self, field: &str, value: T, min: T, max: T)
    where
        T: PartialOrd + Display + Copy,
    {
        if value < min || value > max {
            self.fail(field, format!("must be between {} and {}", min, max));
        }
    }

    pub fn opt_range<T>(&mut self, field: &str, value: Option<T>, min: T, max: T)
    where
        T: PartialOrd + Display + Copy,
    {
        if let Some(value) = value {
            self.range(field, value, min, max);
        }
    }

    pub fn max_items<T>(&mut self, field: &str, items: &[T], max: usize) {
        if items.len() > max {
            self.fail(field, format!("must contain at most {} items", max));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(self.errors))
        }
    }
}

/// Audio uploads must declare an `audio/*` content type.
pub fn is_audio_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("audio/")
}
