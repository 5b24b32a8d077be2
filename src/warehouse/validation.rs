//! Validation for warehouse rows.
//!
//! Rows are validated while they are projected from raw input records, so a
//! malformed record is rejected before anything reaches the store.

use super::models::{ArtistRecord, SongRecord, UserRecord};
use thiserror::Error;

/// Validation error types
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("Field '{field}' is required but was missing")]
    MissingField { field: &'static str },

    #[error("Field '{field}' is required but was empty")]
    EmptyField { field: &'static str },

    #[error("Field '{field}' has invalid value '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Unwraps a required field.
pub fn require<T>(value: Option<T>, field: &'static str) -> ValidationResult<T> {
    value.ok_or(ValidationError::MissingField { field })
}

/// Unwraps a required text field, rejecting blank values.
pub fn require_text(value: Option<String>, field: &'static str) -> ValidationResult<String> {
    let value = require(value, field)?;
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(value)
}

pub fn validate_song(song: &SongRecord) -> ValidationResult<()> {
    if song.song_id.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "song_id" });
    }
    if song.artist_id.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "artist_id" });
    }
    if !song.duration.is_finite() || song.duration < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "duration",
            value: song.duration.to_string(),
        });
    }
    Ok(())
}

pub fn validate_artist(artist: &ArtistRecord) -> ValidationResult<()> {
    if artist.artist_id.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "artist_id" });
    }
    if artist.name.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "artist_name" });
    }
    Ok(())
}

pub fn validate_user(user: &UserRecord) -> ValidationResult<()> {
    if user.user_id < 0 {
        return Err(ValidationError::InvalidValue {
            field: "userId",
            value: user.user_id.to_string(),
        });
    }
    if user.first_name.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "firstName" });
    }
    if user.last_name.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "lastName" });
    }
    if user.gender.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "gender" });
    }
    Ok(())
}
