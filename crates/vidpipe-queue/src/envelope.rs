//! Pub/Sub push envelope decoding.
//!
//! Push delivery wraps the published payload in
//! `{"message": {"data": "<base64 JSON>", ...}, "subscription": ...}`.

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{QueueError, QueueResult};

/// The push-delivery request body.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    pub message: Option<PushMessage>,
    pub subscription: Option<String>,
}

/// The wrapped Pub/Sub message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub data: Option<String>,
    pub message_id: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl PushEnvelope {
    /// Delivery id for log correlation.
    pub fn message_id(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.message_id.as_deref())
    }
}

/// A Cloud Storage upload notification: the only field the pipeline needs
/// is the object name.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadNotification {
    pub name: Option<String>,
    pub bucket: Option<String>,
}

/// Decode the base64 JSON payload inside an envelope.
fn decode_data(envelope: &PushEnvelope) -> QueueResult<Vec<u8>> {
    let data = envelope
        .message
        .as_ref()
        .and_then(|m| m.data.as_ref())
        .ok_or(QueueError::MissingData)?;

    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|_| QueueError::InvalidJson)
}

/// Decode an upload notification, requiring the object name.
pub fn decode_upload_notification(envelope: &PushEnvelope) -> QueueResult<UploadNotification> {
    let bytes = decode_data(envelope)?;
    let notification: UploadNotification =
        serde_json::from_slice(&bytes).map_err(|_| QueueError::InvalidJson)?;

    match notification.name.as_deref() {
        Some(name) if !name.is_empty() => Ok(notification),
        _ => Err(QueueError::MissingFilename),
    }
}

/// Decode an arbitrary published job payload.
pub fn decode_job<T: DeserializeOwned>(envelope: &PushEnvelope) -> QueueResult<T> {
    let bytes = decode_data(envelope)?;
    serde_json::from_slice(&bytes).map_err(|_| QueueError::InvalidJson)
}

/// Job published to the transcription topic after a successful transcode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionJobPayload {
    pub video_id: String,
    pub transcript_id: String,
    pub audio_gcs_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Set when resuming a job whose operation was already submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn envelope_with_data(data: &str) -> PushEnvelope {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        serde_json::from_value(serde_json::json!({
            "message": {"data": encoded, "messageId": "m1"},
            "subscription": "projects/p/subscriptions/s"
        }))
        .unwrap()
    }

    #[test]
    fn test_missing_data_is_rejected() {
        let envelope: PushEnvelope = serde_json::from_value(serde_json::json!({
            "message": {"messageId": "m1"}
        }))
        .unwrap();
        assert!(matches!(
            decode_upload_notification(&envelope),
            Err(QueueError::MissingData)
        ));

        let empty: PushEnvelope = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(
            decode_upload_notification(&empty),
            Err(QueueError::MissingData)
        ));
    }

    #[test]
    fn test_garbage_data_is_invalid_json() {
        let envelope = envelope_with_data("not json");
        assert!(matches!(
            decode_upload_notification(&envelope),
            Err(QueueError::InvalidJson)
        ));
    }

    #[test]
    fn test_notification_without_name_is_rejected() {
        let envelope = envelope_with_data(r#"{"bucket": "raw"}"#);
        assert!(matches!(
            decode_upload_notification(&envelope),
            Err(QueueError::MissingFilename)
        ));

        let empty_name = envelope_with_data(r#"{"name": ""}"#);
        assert!(matches!(
            decode_upload_notification(&empty_name),
            Err(QueueError::MissingFilename)
        ));
    }

    #[test]
    fn test_valid_notification_decodes() {
        let envelope = envelope_with_data(r#"{"name": "u1-42.mp4", "bucket": "raw"}"#);
        let notification = decode_upload_notification(&envelope).unwrap();
        assert_eq!(notification.name.as_deref(), Some("u1-42.mp4"));
        assert_eq!(envelope.message_id(), Some("m1"));
    }

    #[test]
    fn test_job_payload_roundtrip() {
        let payload = TranscriptionJobPayload {
            video_id: "u1-42".to_string(),
            transcript_id: "primary".to_string(),
            audio_gcs_uri: "gs://audio/u1-42.flac".to_string(),
            user_id: Some("u1".to_string()),
            operation_name: None,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"videoId\""));
        assert!(json.contains("\"audioGcsUri\""));
        assert!(!json.contains("operationName"));

        let envelope = envelope_with_data(&json);
        let decoded: TranscriptionJobPayload = decode_job(&envelope).unwrap();
        assert_eq!(decoded, payload);
    }
}
