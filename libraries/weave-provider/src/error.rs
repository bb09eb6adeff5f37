//! Error types for the content provider client.

use thiserror::Error;
use weave_core::WeaveError;

/// Errors that can occur when talking to the content provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider returned an error response
    #[error("Provider error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Token missing, expired or rejected
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid provider URL
    #[error("Invalid provider URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse provider response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Provider is offline or unreachable
    #[error("Provider unreachable: {0}")]
    Unreachable(String),

    /// Rate limited by provider
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// A paginated listing did not terminate
    #[error("Listing exceeded {0} pages")]
    TooManyPages(usize),
}

impl ProviderError {
    /// Attach the resource being fetched and convert into the engine error
    pub fn into_upstream(self, resource: impl Into<String>) -> WeaveError {
        WeaveError::upstream(resource, self.to_string())
    }
}

impl From<ProviderError> for WeaveError {
    fn from(err: ProviderError) -> Self {
        err.into_upstream("provider")
    }
}

/// Result type for provider client operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
