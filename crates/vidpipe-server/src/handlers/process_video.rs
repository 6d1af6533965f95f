//! Upload-notification ingress.
//!
//! Receives push deliveries for new raw uploads and runs the processing
//! pipeline. This endpoint always replies 200: a non-success status would
//! make the upstream queue redeliver work that has already been attempted,
//! and the durable outcome lives in the ledger, not in this response. Bad
//! envelopes are logged at error level and acknowledged.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{error, info};

use vidpipe_models::{uid_from_video_id, video_id_from_filename, Video, VideoStatus};
use vidpipe_queue::{decode_upload_notification, PushEnvelope};

use crate::state::AppState;

pub async fn process_video(State(state): State<AppState>, body: Bytes) -> (StatusCode, String) {
    let envelope: PushEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(error = %e, "Undecodable request body");
            return ack("Acknowledged: invalid request body");
        }
    };

    let notification = match decode_upload_notification(&envelope) {
        Ok(notification) => notification,
        Err(e) => {
            error!(message_id = envelope.message_id(), error = %e, "Bad envelope");
            return ack(format!("Acknowledged: {e}"));
        }
    };

    // decode_upload_notification guarantees a non-empty name
    let filename = notification.name.unwrap_or_default();
    let video_id = video_id_from_filename(&filename).to_string();

    match state.ledger.is_new_video(&video_id).await {
        Ok(true) => {}
        Ok(false) => {
            info!(video_id, "Video already claimed, skipping redelivery");
            return ack(format!("Video {video_id} already processed or in progress, skipping"));
        }
        Err(e) => {
            error!(video_id, error = %e, "Idempotency check failed");
            return ack(format!("Acknowledged, but processing failed: {e}"));
        }
    }

    let claim = Video {
        id: Some(video_id.clone()),
        uid: Some(uid_from_video_id(&video_id).to_string()),
        status: Some(VideoStatus::Processing),
        ..Default::default()
    };
    if let Err(e) = state.ledger.set_video(&video_id, &claim).await {
        error!(video_id, error = %e, "Failed to claim video");
        return ack(format!("Acknowledged, but processing failed: {e}"));
    }

    match state.processor.process(&filename).await {
        Ok(()) => ack(format!("Processing finished successfully: {filename}")),
        Err(e) => {
            error!(video_id, error = %e, "Processing failed");
            ack(format!("Acknowledged, but processing failed: {e}"))
        }
    }
}

fn ack(message: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::OK, message.into())
}
