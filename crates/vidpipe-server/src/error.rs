//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vidpipe_storage::StorageError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] vidpipe_firestore::FirestoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] vidpipe_queue::QueueError),

    #[error("Media error: {0}")]
    Media(#[from] vidpipe_media::MediaError),

    #[error("Transcription error: {0}")]
    Speech(#[from] vidpipe_speech::SpeechError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            // Envelope decode problems are the sender's fault
            ApiError::Queue(e) if e.is_bad_request() => StatusCode::BAD_REQUEST,
            ApiError::Ledger(e) => e
                .http_status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Internal(_)
            | ApiError::Storage(_)
            | ApiError::Queue(_)
            | ApiError::Media(_)
            | ApiError::Speech(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status.is_server_error()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse { detail, code: None };

        (status, Json(body)).into_response()
    }
}
