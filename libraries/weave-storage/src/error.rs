/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// A stored row could not be turned back into a domain value
    #[error("Corrupt {entity} row {id}: {reason}")]
    CorruptRow {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// Serialization/deserialization error of a JSON column
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Create a corrupt row error
    pub fn corrupt(entity: &'static str, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptRow {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }
}

impl From<StorageError> for weave_core::WeaveError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Database(e) => weave_core::WeaveError::Database(e.to_string()),
            other => weave_core::WeaveError::storage(other.to_string()),
        }
    }
}
