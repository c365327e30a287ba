//! Boundary validation for caller-supplied bundle fields

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_VERSION_LEN: usize = 20;
pub const MAX_TAG_LEN: usize = 256;
pub const MAX_NOTE_LEN: usize = 512;

/// Rejected caller input. Always a client error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid platform specified: {0}")]
    UnknownPlatform(String),

    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at most {max} characters long (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("version {0:?} must not contain path separators or '..'")]
    UnsafeVersion(String),

    #[error("no bundle file provided for any of: ios, android")]
    MissingArtifacts,
}

/// Reservation request for a new bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBundle {
    pub version: String,
    pub tag: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewBundle {
    pub fn new(version: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            tag: tag.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Check field lengths. Tag allow-listing happens in the service, which
    /// owns the configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_version(&self.version)?;
        validate_tag(&self.tag)?;
        if let Some(note) = &self.note {
            validate_note(note)?;
        }
        Ok(())
    }
}

pub fn validate_version(version: &str) -> Result<(), ValidationError> {
    check_len("version", version, MAX_VERSION_LEN)?;
    // The version is a path segment of the artifact key.
    if version.contains('/') || version.contains('\\') || version.contains("..") {
        return Err(ValidationError::UnsafeVersion(version.to_string()));
    }
    Ok(())
}

pub fn validate_tag(tag: &str) -> Result<(), ValidationError> {
    check_len("tag", tag, MAX_TAG_LEN)
}

pub fn validate_note(note: &str) -> Result<(), ValidationError> {
    let actual = note.chars().count();
    if actual > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: "note",
            max: MAX_NOTE_LEN,
            actual,
        });
    }
    Ok(())
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual == 0 {
        return Err(ValidationError::Required(field));
    }
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}
