//! Firestore error types.

use thiserror::Error;

/// Result type for Firestore operations.
pub type FirestoreResult<T> = Result<T, FirestoreError>;

/// Errors that can occur during Firestore operations.
#[derive(Debug, Error)]
pub enum FirestoreError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Write rejected by the status state machine
    #[error("Invalid status transition on {path}: {current:?} -> {next}")]
    InvalidTransition {
        path: String,
        current: Option<String>,
        next: String,
    },
}

impl FirestoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_transition(
        path: impl Into<String>,
        current: Option<&str>,
        next: &str,
    ) -> Self {
        Self::InvalidTransition {
            path: path.into(),
            current: current.map(str::to_string),
            next: next.to_string(),
        }
    }

    /// Map an HTTP status to a typed error.
    pub fn from_http_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::AuthError(message),
            403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            429 => Self::RateLimited(1000),
            _ => Self::RequestFailed(message),
        }
    }

    /// HTTP status for metrics labelling.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::AuthError(_) => Some(401),
            Self::PermissionDenied(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::RateLimited(_) => Some(429),
            Self::InvalidTransition { .. } => Some(409),
            _ => None,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status_mapping() {
        assert!(matches!(
            FirestoreError::from_http_status(404, "x".into()),
            FirestoreError::NotFound(_)
        ));
        assert!(matches!(
            FirestoreError::from_http_status(403, "x".into()),
            FirestoreError::PermissionDenied(_)
        ));
        assert!(matches!(
            FirestoreError::from_http_status(429, "x".into()),
            FirestoreError::RateLimited(_)
        ));
        assert!(matches!(
            FirestoreError::from_http_status(500, "x".into()),
            FirestoreError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_invalid_transition_maps_to_conflict() {
        let err = FirestoreError::invalid_transition("videos/v1", Some("processed"), "processing");
        assert_eq!(err.http_status(), Some(409));
    }
}
