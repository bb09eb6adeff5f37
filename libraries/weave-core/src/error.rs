/// Core error types for Weave
use crate::types::{BlendId, SequenceId, SessionId};
use thiserror::Error;

/// Result type alias using `WeaveError`
pub type Result<T> = std::result::Result<T, WeaveError>;

/// Core error type for Weave
#[derive(Error, Debug)]
pub enum WeaveError {
    /// The content provider was unavailable or rejected a request
    #[error("Upstream fetch failed for {resource}: {message}")]
    UpstreamFetch { resource: String, message: String },

    /// Blend definition not found
    #[error("Blend definition not found: {0}")]
    DefinitionNotFound(BlendId),

    /// Sequence not found
    #[error("Sequence not found: {0}")]
    SequenceNotFound(SequenceId),

    /// Playback session not found
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Weights do not sum to 100 (or are otherwise malformed)
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No playable candidate remains in any eligible pool
    #[error("No more items available for playback")]
    Exhausted,

    /// The final stage of a sequence ran out of items
    #[error("Sequence completed: {0}")]
    SequenceCompleted(SequenceId),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Database errors (for storage implementations)
    #[error("Database error: {0}")]
    Database(String),
}

impl WeaveError {
    /// Create an upstream fetch error
    pub fn upstream(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamFetch {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create an invalid weights error
    pub fn invalid_weights(msg: impl Into<String>) -> Self {
        Self::InvalidWeights(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True for the recoverable "nothing left to play" condition
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

#[cfg(feature = "sqlx-support")]
impl From<sqlx::Error> for WeaveError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}
