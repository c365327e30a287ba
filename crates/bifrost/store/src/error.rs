use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-layer errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// Primary-key or constraint collision. Fatal for the request.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An update carried no field to write. Callers log it and move on.
    #[error("no changes: {0}")]
    NoChanges(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Non-fatal outcomes that should be logged rather than surfaced.
    pub fn is_warning(&self) -> bool {
        matches!(self, StoreError::NoChanges(_))
    }
}
