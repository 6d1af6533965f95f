//! Transcription-job ingress.
//!
//! Accepts either the bare job payload or a push-delivery envelope
//! wrapping it. Unlike process-video, this endpoint returns real error
//! statuses: 400 for missing fields, 500 for internal failures, so the
//! queue redelivers failed jobs and the persisted operation handle lets
//! the redelivery resume.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use vidpipe_queue::{decode_job, PushEnvelope, TranscriptionJobPayload};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::transcription::TranscribeOutcome;

/// Job fields as they arrive on the wire, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscribeRequest {
    video_id: Option<String>,
    transcript_id: Option<String>,
    audio_gcs_uri: Option<String>,
    user_id: Option<String>,
    operation_name: Option<String>,
}

impl TranscribeRequest {
    fn into_job(self) -> ApiResult<TranscriptionJobPayload> {
        Ok(TranscriptionJobPayload {
            video_id: require(self.video_id, "videoId")?,
            transcript_id: require(self.transcript_id, "transcriptId")?,
            audio_gcs_uri: require(self.audio_gcs_uri, "audioGcsUri")?,
            user_id: self.user_id,
            operation_name: self.operation_name,
        })
    }
}

fn require(value: Option<String>, name: &str) -> ApiResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(format!("Missing required field: {name}"))),
    }
}

fn decode_request(body: serde_json::Value) -> ApiResult<TranscriptionJobPayload> {
    // Push subscriptions wrap the payload in an envelope; direct callers
    // send it bare.
    if body.get("message").is_some() {
        let envelope: PushEnvelope = serde_json::from_value(body)
            .map_err(|e| ApiError::bad_request(format!("Invalid envelope: {e}")))?;
        let request: TranscribeRequest = decode_job(&envelope)?;
        request.into_job()
    } else {
        let request: TranscribeRequest = serde_json::from_value(body)
            .map_err(|e| ApiError::bad_request(format!("Invalid payload: {e}")))?;
        request.into_job()
    }
}

pub async fn transcribe_audio(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<(StatusCode, String)> {
    let job = decode_request(body)?;
    info!(
        video_id = %job.video_id,
        transcript_id = %job.transcript_id,
        "Received transcription job"
    );

    let outcome = state.transcription.run(&job).await?;
    let message = match outcome {
        TranscribeOutcome::Completed {
            segment_count,
            duration_seconds,
        } => format!(
            "Transcription complete: {segment_count} segments, {duration_seconds:.1}s"
        ),
        TranscribeOutcome::AlreadyDone => {
            format!("Transcript for {} already completed, skipping", job.video_id)
        }
        TranscribeOutcome::RecordMissing => {
            format!("Acknowledged: no transcript record for {}", job.video_id)
        }
    };

    Ok((StatusCode::OK, message))
}
