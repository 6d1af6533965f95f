//! Typed repositories for video and transcript records.
//!
//! All writes go through merge-semantics patches: a mutation carries only
//! the fields it changes plus a matching update mask, so concurrent
//! writers never clobber each other's fields and redeliveries are
//! idempotent.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::Utc;
use tracing::{debug, info};

use vidpipe_models::{Transcript, TranscriptStatus, TranscriptUpdate, Video, VideoStatus};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, ToFirestoreValue, Value};

/// Top-level collection holding video records.
const VIDEOS_COLLECTION: &str = "videos";

/// Subcollection of a video holding its transcript records.
const TRANSCRIPTS_SUBCOLLECTION: &str = "transcripts";

// =============================================================================
// Video repository
// =============================================================================

/// Repository for video documents at `videos/{videoId}`.
#[derive(Clone)]
pub struct VideoRepository {
    client: FirestoreClient,
}

impl VideoRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn doc_path(video_id: &str) -> String {
        format!("{}/{}", VIDEOS_COLLECTION, video_id)
    }

    /// Get a video by ID.
    pub async fn get(&self, video_id: &str) -> FirestoreResult<Option<Video>> {
        let doc = self.client.get_document(&Self::doc_path(video_id)).await?;
        Ok(doc.map(|d| document_to_video(&d)))
    }

    /// Merge the populated fields of `video` into the record.
    ///
    /// Creates the document if it does not exist.
    pub async fn set(&self, video_id: &str, video: &Video) -> FirestoreResult<()> {
        let (fields, mask) = video_to_fields(video);
        if mask.is_empty() {
            debug!(video_id, "Skipping empty video mutation");
            return Ok(());
        }

        self.client
            .patch_document(&Self::doc_path(video_id), fields, mask)
            .await?;
        Ok(())
    }

    /// Move the status field, enforcing the monotonic state machine.
    ///
    /// Reads the current status first; a write that would move a record
    /// backwards (or resurrect a terminal one) is rejected with
    /// [`FirestoreError::InvalidTransition`].
    pub async fn set_status(&self, video_id: &str, status: VideoStatus) -> FirestoreResult<()> {
        let current = self
            .get(video_id)
            .await?
            .and_then(|v| v.status);

        if !VideoStatus::can_follow(current, status) {
            return Err(FirestoreError::invalid_transition(
                Self::doc_path(video_id),
                current.map(|s| s.as_str()),
                status.as_str(),
            ));
        }

        self.set(video_id, &Video::with_status(status)).await?;
        info!(video_id, status = %status, "Updated video status");
        Ok(())
    }

    /// A video is new when its record is absent or has never been claimed
    /// (no status field). Redelivered messages for a claimed id are no-ops.
    pub async fn is_new(&self, video_id: &str) -> FirestoreResult<bool> {
        match self.get(video_id).await? {
            None => Ok(true),
            Some(video) => Ok(video.is_new()),
        }
    }
}

// =============================================================================
// Transcript repository
// =============================================================================

/// Repository for transcript documents at
/// `videos/{videoId}/transcripts/{transcriptId}`.
#[derive(Clone)]
pub struct TranscriptRepository {
    client: FirestoreClient,
}

impl TranscriptRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn doc_path(video_id: &str, transcript_id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            VIDEOS_COLLECTION, video_id, TRANSCRIPTS_SUBCOLLECTION, transcript_id
        )
    }

    /// Get a transcript record.
    pub async fn get(
        &self,
        video_id: &str,
        transcript_id: &str,
    ) -> FirestoreResult<Option<Transcript>> {
        let doc = self
            .client
            .get_document(&Self::doc_path(video_id, transcript_id))
            .await?;
        Ok(doc.and_then(|d| document_to_transcript(&d)))
    }

    /// Register a fresh transcript record (merge upsert).
    pub async fn create(&self, transcript_id: &str, transcript: &Transcript) -> FirestoreResult<()> {
        let (fields, mask) = transcript_to_fields(transcript);
        self.client
            .patch_document(
                &Self::doc_path(&transcript.video_id, transcript_id),
                fields,
                mask,
            )
            .await?;
        info!(
            video_id = %transcript.video_id,
            transcript_id,
            "Registered transcript record"
        );
        Ok(())
    }

    /// Apply a partial mutation, enforcing the status state machine.
    ///
    /// When the mutation moves status into a terminal state and carries no
    /// completion time, `completedAt` is stamped with the current time.
    pub async fn update(
        &self,
        video_id: &str,
        transcript_id: &str,
        mut update: TranscriptUpdate,
    ) -> FirestoreResult<()> {
        if let Some(next) = update.status {
            let current = self
                .get(video_id, transcript_id)
                .await?
                .map(|t| t.status);

            if !TranscriptStatus::can_follow(current, next) {
                return Err(FirestoreError::invalid_transition(
                    Self::doc_path(video_id, transcript_id),
                    current.map(|s| s.as_str()),
                    next.as_str(),
                ));
            }

            if next.is_terminal() && update.completed_at.is_none() {
                update.completed_at = Some(Utc::now());
            }
        }

        let (fields, mask) = transcript_update_to_fields(&update);
        if mask.is_empty() {
            debug!(video_id, transcript_id, "Skipping empty transcript mutation");
            return Ok(());
        }

        self.client
            .patch_document(&Self::doc_path(video_id, transcript_id), fields, mask)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Field mapping
// =============================================================================

fn push_field(
    fields: &mut HashMap<String, Value>,
    mask: &mut Vec<String>,
    name: &str,
    value: Value,
) {
    fields.insert(name.to_string(), value);
    mask.push(name.to_string());
}

/// Map populated video fields to Firestore fields plus an update mask.
pub fn video_to_fields(video: &Video) -> (HashMap<String, Value>, Vec<String>) {
    let mut fields = HashMap::new();
    let mut mask = Vec::new();

    if let Some(id) = &video.id {
        push_field(&mut fields, &mut mask, "id", id.to_firestore_value());
    }
    if let Some(uid) = &video.uid {
        push_field(&mut fields, &mut mask, "uid", uid.to_firestore_value());
    }
    if let Some(filename) = &video.filename {
        push_field(&mut fields, &mut mask, "filename", filename.to_firestore_value());
    }
    if let Some(status) = video.status {
        push_field(&mut fields, &mut mask, "status", status.as_str().to_firestore_value());
    }
    if let Some(title) = &video.title {
        push_field(&mut fields, &mut mask, "title", title.to_firestore_value());
    }
    if let Some(description) = &video.description {
        push_field(&mut fields, &mut mask, "description", description.to_firestore_value());
    }

    (fields, mask)
}

fn document_to_video(doc: &Document) -> Video {
    Video {
        id: doc.field("id"),
        uid: doc.field("uid"),
        filename: doc.field("filename"),
        status: doc
            .field::<String>("status")
            .and_then(|s| VideoStatus::from_str(&s).ok()),
        title: doc.field("title"),
        description: doc.field("description"),
    }
}

/// Map a full transcript record to Firestore fields plus an update mask.
pub fn transcript_to_fields(t: &Transcript) -> (HashMap<String, Value>, Vec<String>) {
    let mut fields = HashMap::new();
    let mut mask = Vec::new();

    push_field(&mut fields, &mut mask, "videoId", t.video_id.to_firestore_value());
    push_field(&mut fields, &mut mask, "status", t.status.as_str().to_firestore_value());
    push_field(&mut fields, &mut mask, "language", t.language.to_firestore_value());
    push_field(&mut fields, &mut mask, "model", t.model.to_firestore_value());

    if let Some(v) = &t.operation_name {
        push_field(&mut fields, &mut mask, "operationName", v.to_firestore_value());
    }
    if let Some(v) = &t.gcs_path {
        push_field(&mut fields, &mut mask, "gcsPath", v.to_firestore_value());
    }
    if let Some(v) = t.segment_count {
        push_field(&mut fields, &mut mask, "segmentCount", v.to_firestore_value());
    }
    if let Some(v) = t.duration_seconds {
        push_field(&mut fields, &mut mask, "durationSeconds", v.to_firestore_value());
    }
    if let Some(v) = t.created_at {
        push_field(&mut fields, &mut mask, "createdAt", v.to_firestore_value());
    }
    if let Some(v) = t.completed_at {
        push_field(&mut fields, &mut mask, "completedAt", v.to_firestore_value());
    }
    if let Some(v) = &t.error {
        push_field(&mut fields, &mut mask, "error", v.to_firestore_value());
    }
    if let Some(v) = &t.audio_gcs_uri {
        push_field(&mut fields, &mut mask, "audioGcsUri", v.to_firestore_value());
    }
    if let Some(v) = &t.user_id {
        push_field(&mut fields, &mut mask, "userId", v.to_firestore_value());
    }

    (fields, mask)
}

/// Map a partial transcript mutation to Firestore fields plus an update mask.
pub fn transcript_update_to_fields(u: &TranscriptUpdate) -> (HashMap<String, Value>, Vec<String>) {
    let mut fields = HashMap::new();
    let mut mask = Vec::new();

    if let Some(status) = u.status {
        push_field(&mut fields, &mut mask, "status", status.as_str().to_firestore_value());
    }
    if let Some(v) = &u.operation_name {
        push_field(&mut fields, &mut mask, "operationName", v.to_firestore_value());
    }
    if let Some(v) = &u.gcs_path {
        push_field(&mut fields, &mut mask, "gcsPath", v.to_firestore_value());
    }
    if let Some(v) = u.segment_count {
        push_field(&mut fields, &mut mask, "segmentCount", v.to_firestore_value());
    }
    if let Some(v) = u.duration_seconds {
        push_field(&mut fields, &mut mask, "durationSeconds", v.to_firestore_value());
    }
    if let Some(v) = u.completed_at {
        push_field(&mut fields, &mut mask, "completedAt", v.to_firestore_value());
    }
    if let Some(v) = &u.error {
        push_field(&mut fields, &mut mask, "error", v.to_firestore_value());
    }

    (fields, mask)
}

fn document_to_transcript(doc: &Document) -> Option<Transcript> {
    let status = doc
        .field::<String>("status")
        .and_then(|s| match s.as_str() {
            "pending" => Some(TranscriptStatus::Pending),
            "running" => Some(TranscriptStatus::Running),
            "failed" => Some(TranscriptStatus::Failed),
            "done" => Some(TranscriptStatus::Done),
            _ => None,
        })?;

    Some(Transcript {
        video_id: doc.field("videoId").unwrap_or_default(),
        status,
        language: doc.field("language").unwrap_or_default(),
        model: doc.field("model").unwrap_or_default(),
        operation_name: doc.field("operationName"),
        gcs_path: doc.field("gcsPath"),
        segment_count: doc.field("segmentCount"),
        duration_seconds: doc.field("durationSeconds"),
        created_at: doc.field("createdAt"),
        completed_at: doc.field("completedAt"),
        error: doc.field("error"),
        audio_gcs_uri: doc.field("audioGcsUri"),
        user_id: doc.field("userId"),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_mask_matches_populated_fields() {
        let video = Video {
            id: Some("abc-1".to_string()),
            uid: Some("abc".to_string()),
            filename: Some("abc-1.mp4".to_string()),
            status: Some(VideoStatus::Processing),
            title: None,
            description: None,
        };

        let (fields, mask) = video_to_fields(&video);
        assert_eq!(mask.len(), 4);
        assert_eq!(fields.len(), 4);
        assert!(mask.contains(&"status".to_string()));
        assert!(!mask.contains(&"title".to_string()));
        assert!(matches!(
            fields.get("status"),
            Some(Value::StringValue(s)) if s == "processing"
        ));
    }

    #[test]
    fn test_status_only_mutation_has_single_field_mask() {
        let (fields, mask) = video_to_fields(&Video::with_status(VideoStatus::Processed));
        assert_eq!(mask, vec!["status".to_string()]);
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_video_roundtrip_through_document() {
        let video = Video {
            id: Some("u1-42".to_string()),
            uid: Some("u1".to_string()),
            filename: Some("u1-42.mp4".to_string()),
            status: Some(VideoStatus::Failed),
            title: Some("clip".to_string()),
            description: None,
        };

        let (fields, _) = video_to_fields(&video);
        let doc = Document::new(fields);
        assert_eq!(document_to_video(&doc), video);
    }

    #[test]
    fn test_unknown_status_reads_as_none() {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), "archived".to_firestore_value());
        let doc = Document::new(fields);
        assert!(document_to_video(&doc).status.is_none());
    }

    #[test]
    fn test_transcript_roundtrip_through_document() {
        let transcript = Transcript::pending("u1-42", "en-US", "long")
            .with_audio_uri("gs://audio/u1-42.flac")
            .with_user_id("u1");

        let (fields, mask) = transcript_to_fields(&transcript);
        assert!(mask.contains(&"audioGcsUri".to_string()));
        assert!(!mask.contains(&"operationName".to_string()));

        let doc = Document::new(fields);
        let back = document_to_transcript(&doc).unwrap();
        assert_eq!(back.video_id, "u1-42");
        assert_eq!(back.status, TranscriptStatus::Pending);
        assert_eq!(back.audio_gcs_uri.as_deref(), Some("gs://audio/u1-42.flac"));
        // Timestamps survive to millisecond precision through RFC 3339
        assert_eq!(
            back.created_at.unwrap().timestamp_millis(),
            transcript.created_at.unwrap().timestamp_millis()
        );
    }

    #[test]
    fn test_transcript_without_status_does_not_decode() {
        let mut fields = HashMap::new();
        fields.insert("videoId".to_string(), "v1".to_firestore_value());
        let doc = Document::new(fields);
        assert!(document_to_transcript(&doc).is_none());
    }

    #[test]
    fn test_update_mask_only_carries_populated_fields() {
        let update = TranscriptUpdate {
            status: Some(TranscriptStatus::Running),
            operation_name: Some("operations/op-1".to_string()),
            ..Default::default()
        };

        let (fields, mask) = transcript_update_to_fields(&update);
        assert_eq!(mask.len(), 2);
        assert!(mask.contains(&"status".to_string()));
        assert!(mask.contains(&"operationName".to_string()));
        assert!(matches!(
            fields.get("status"),
            Some(Value::StringValue(s)) if s == "running"
        ));
    }
}
