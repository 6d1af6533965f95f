//! Error types for GCP authentication.

use thiserror::Error;

/// Errors from token acquisition.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token provider could be discovered from the environment
    #[error("auth provider error: {message}")]
    Provider { message: String },

    /// Token refresh failed and no usable cached token remained
    #[error("token refresh error: {message}")]
    Refresh { message: String },
}

impl AuthError {
    pub fn provider(message: impl Into<String>) -> Self {
        AuthError::Provider {
            message: message.into(),
        }
    }

    pub fn refresh(message: impl Into<String>) -> Self {
        AuthError::Refresh {
            message: message.into(),
        }
    }
}

/// Result type alias for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
