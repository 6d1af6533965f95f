//! Transcript records and the durable transcript artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a transcription job.
///
/// Owned by the transcription pipeline after the orchestrator creates the
/// record in `Pending`. Once `Done`, the record is immutable to further job
/// retries; the runner checks this before making any external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    /// Record created, job not yet published or picked up
    Pending,
    /// Recognition operation submitted and being polled
    Running,
    /// Terminal failure (remote error, poll timeout, missing record)
    Failed,
    /// Transcript artifact uploaded, terminal and immutable
    Done,
}

impl TranscriptStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptStatus::Pending => "pending",
            TranscriptStatus::Running => "running",
            TranscriptStatus::Failed => "failed",
            TranscriptStatus::Done => "done",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TranscriptStatus::Done | TranscriptStatus::Failed)
    }

    /// Validate a status transition.
    ///
    /// `Done` never accepts another write. `Failed` stays retryable (a
    /// redelivered job may resume the persisted operation handle), and a
    /// record can be created directly in `Failed` when a job arrives for a
    /// transcript that was never registered.
    pub fn can_follow(current: Option<TranscriptStatus>, next: TranscriptStatus) -> bool {
        use TranscriptStatus::*;
        match current {
            None => matches!(next, Pending | Running | Failed),
            Some(Pending) => true,
            Some(Running) => matches!(next, Running | Failed | Done),
            Some(Failed) => matches!(next, Running | Failed | Done),
            Some(Done) => false,
        }
    }
}

impl std::fmt::Display for TranscriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transcript record, persisted as a child document of a video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub video_id: String,
    pub status: TranscriptStatus,
    /// Recognition language code (e.g. "en-US")
    pub language: String,
    /// Recognition model ("long" or "short")
    pub model: String,
    /// Handle to the remote long-running recognition operation.
    ///
    /// Persisted before the first poll so a redelivered job resumes the
    /// same operation instead of submitting a duplicate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    /// Location of the final transcript artifact (gs:// URI)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcs_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_gcs_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Transcript {
    /// Create a fresh `Pending` record for a video.
    pub fn pending(
        video_id: impl Into<String>,
        language: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            status: TranscriptStatus::Pending,
            language: language.into(),
            model: model.into(),
            operation_name: None,
            gcs_path: None,
            segment_count: None,
            duration_seconds: None,
            created_at: Some(Utc::now()),
            completed_at: None,
            error: None,
            audio_gcs_uri: None,
            user_id: None,
        }
    }

    /// Set the audio work-file URI.
    pub fn with_audio_uri(mut self, uri: impl Into<String>) -> Self {
        self.audio_gcs_uri = Some(uri.into());
        self
    }

    /// Set the owning user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Partial transcript mutation with merge semantics.
///
/// Only populated fields reach the store; everything else is untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TranscriptStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcs_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranscriptUpdate {
    /// Mutation that records the remote operation handle.
    pub fn operation(name: impl Into<String>) -> Self {
        Self {
            operation_name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Mutation that records an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// One timed span of recognized speech.
///
/// Transient: aggregated into a [`TranscriptPayload`], never persisted as
/// its own document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub text: String,
    /// Seconds from the start of the audio
    pub start_time: f64,
    pub end_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// The durable transcript artifact uploaded to blob storage.
///
/// Stored as JSON at `<videoId>/transcript.json` in the transcripts bucket
/// rather than in the metadata store, keeping document sizes bounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptPayload {
    pub video_id: String,
    pub language: String,
    pub model: String,
    pub duration_seconds: f64,
    pub segments: Vec<TranscriptSegment>,
    pub created_at: DateTime<Utc>,
}
