//! Queue error types.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur decoding envelopes or publishing jobs.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The push body has no `message.data`
    #[error("No message data found in request")]
    MissingData,

    /// `message.data` did not decode to JSON
    #[error("Invalid JSON in message")]
    InvalidJson,

    /// An upload notification without an object name
    #[error("Missing filename in payload")]
    MissingFilename,

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Topic name is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn publish_failed(msg: impl Into<String>) -> Self {
        Self::PublishFailed(msg.into())
    }

    /// Whether the sender should be told the request itself was malformed.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            QueueError::MissingData | QueueError::InvalidJson | QueueError::MissingFilename
        )
    }
}
