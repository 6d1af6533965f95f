//! Speech recognition error types.

use thiserror::Error;

/// Result type for speech operations.
pub type SpeechResult<T> = Result<T, SpeechError>;

/// Errors that can occur during speech recognition.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Failed to start recognition: {0}")]
    StartFailed(String),

    /// The recognizer never returned an operation handle
    #[error("Recognizer did not return an operation name")]
    MissingOperationName,

    /// The operation did not finish within the polling budget
    #[error("Operation {operation} did not complete within {attempts} polls")]
    PollTimeout { operation: String, attempts: u32 },

    /// The operation finished with a remote error status
    #[error("Operation {operation} failed: {message}")]
    OperationFailed { operation: String, message: String },

    /// The operation finished but carried no recognition response
    #[error("Recognition response missing for operation {0}")]
    MissingResponse(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpeechError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn start_failed(msg: impl Into<String>) -> Self {
        Self::StartFailed(msg.into())
    }

    pub fn operation_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}
