//! Transcription job execution.
//!
//! Consumes jobs published after a successful transcode: resolves the
//! transcript record, submits or resumes the recognition operation, polls
//! it to completion, uploads the transcript artifact, and records the
//! terminal state. The operation handle is persisted before the first
//! poll so a redelivered job resumes instead of re-submitting.

use std::sync::Arc;

use tracing::{error, info, warn};

use vidpipe_models::{TranscriptStatus, TranscriptUpdate};
use vidpipe_queue::TranscriptionJobPayload;
use vidpipe_speech::build_payload;

use crate::error::{ApiError, ApiResult};
use crate::gateway::{Ledger, MediaStore, Recognizer};

/// How a job ended, for the handler's acknowledgment text.
#[derive(Debug, PartialEq)]
pub enum TranscribeOutcome {
    /// Transcript uploaded and marked `done`
    Completed {
        segment_count: u32,
        duration_seconds: f64,
    },
    /// Record already `done`; nothing to do
    AlreadyDone,
    /// No record for this job; marked `failed` and acknowledged
    RecordMissing,
}

/// Executes one transcription job end to end.
pub struct TranscriptionRunner {
    ledger: Arc<dyn Ledger>,
    storage: Arc<dyn MediaStore>,
    recognizer: Arc<dyn Recognizer>,
    default_language: String,
    default_model: String,
}

impl TranscriptionRunner {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        storage: Arc<dyn MediaStore>,
        recognizer: Arc<dyn Recognizer>,
        default_language: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            storage,
            recognizer,
            default_language: default_language.into(),
            default_model: default_model.into(),
        }
    }

    /// Run a job to a terminal transcript state.
    ///
    /// A missing record is acknowledged, not raised: redelivering such a
    /// job can never succeed. Any other failure marks the record `failed`
    /// and propagates, letting the queue redeliver (`failed` stays
    /// retryable, and the persisted operation handle makes the redelivery
    /// resume rather than restart).
    pub async fn run(&self, job: &TranscriptionJobPayload) -> ApiResult<TranscribeOutcome> {
        let video_id = &job.video_id;
        let transcript_id = &job.transcript_id;

        let Some(record) = self.ledger.get_transcript(video_id, transcript_id).await? else {
            warn!(video_id, transcript_id, "Job for unknown transcript record");
            self.ledger
                .update_transcript(
                    video_id,
                    transcript_id,
                    TranscriptUpdate {
                        status: Some(TranscriptStatus::Failed),
                        error: Some("Transcript record not found".to_string()),
                        ..Default::default()
                    },
                )
                .await?;
            return Ok(TranscribeOutcome::RecordMissing);
        };

        if record.status == TranscriptStatus::Done {
            info!(video_id, transcript_id, "Transcript already done, skipping");
            return Ok(TranscribeOutcome::AlreadyDone);
        }

        let language = non_empty_or(&record.language, &self.default_language);
        let model = non_empty_or(&record.model, &self.default_model);

        let result = self
            .transcribe(job, &record.operation_name, language, model)
            .await;

        match result {
            Ok(outcome) => {
                if matches!(outcome, TranscribeOutcome::Completed { .. }) {
                    crate::metrics::record_transcription_outcome(true);
                }
                Ok(outcome)
            }
            Err(e) => {
                crate::metrics::record_transcription_outcome(false);
                let update = TranscriptUpdate {
                    status: Some(TranscriptStatus::Failed),
                    error: Some(e.to_string()),
                    ..Default::default()
                };
                if let Err(mark) = self
                    .ledger
                    .update_transcript(video_id, transcript_id, update)
                    .await
                {
                    error!(video_id, transcript_id, error = %mark, "Failed to record failure");
                }
                Err(e)
            }
        }
    }

    async fn transcribe(
        &self,
        job: &TranscriptionJobPayload,
        persisted_operation: &Option<String>,
        language: &str,
        model: &str,
    ) -> ApiResult<TranscribeOutcome> {
        let video_id = &job.video_id;
        let transcript_id = &job.transcript_id;

        if job.audio_gcs_uri.is_empty() {
            return Err(ApiError::bad_request("Job carries no audio location"));
        }

        // Resume the operation from the job or the record; submit a new one
        // only when neither has a handle. The handle hits the ledger before
        // the first poll so a crash here is recoverable.
        let operation_name = match job
            .operation_name
            .clone()
            .or_else(|| persisted_operation.clone())
        {
            Some(name) => {
                info!(video_id, operation = %name, "Resuming recognition operation");
                name
            }
            None => {
                let name = self
                    .recognizer
                    .start(&job.audio_gcs_uri, language, model)
                    .await?;
                self.ledger
                    .update_transcript(
                        video_id,
                        transcript_id,
                        TranscriptUpdate::operation(&name),
                    )
                    .await?;
                name
            }
        };

        self.ledger
            .update_transcript(
                video_id,
                transcript_id,
                TranscriptUpdate {
                    status: Some(TranscriptStatus::Running),
                    ..Default::default()
                },
            )
            .await?;

        let (segments, duration_seconds) = self.recognizer.wait(&operation_name).await?;
        let segment_count = segments.len() as u32;

        let payload = build_payload(video_id, language, model, segments, duration_seconds);
        let gcs_path = self.storage.upload_transcript(video_id, &payload).await?;

        self.ledger
            .update_transcript(
                video_id,
                transcript_id,
                TranscriptUpdate {
                    status: Some(TranscriptStatus::Done),
                    gcs_path: Some(gcs_path),
                    segment_count: Some(segment_count),
                    duration_seconds: Some(duration_seconds),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            video_id,
            transcript_id, segment_count, duration_seconds, "Transcription complete"
        );
        Ok(TranscribeOutcome::Completed {
            segment_count,
            duration_seconds,
        })
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLedger, FakeRecognizer, FakeStore};
    use vidpipe_models::{Transcript, DEFAULT_TRANSCRIPT_ID};

    fn runner(
        ledger: &Arc<FakeLedger>,
        store: &Arc<FakeStore>,
        recognizer: &Arc<FakeRecognizer>,
    ) -> TranscriptionRunner {
        TranscriptionRunner::new(
            ledger.clone() as Arc<dyn Ledger>,
            store.clone() as Arc<dyn MediaStore>,
            recognizer.clone() as Arc<dyn Recognizer>,
            "en-US",
            "long",
        )
    }

    fn job(video_id: &str) -> TranscriptionJobPayload {
        TranscriptionJobPayload {
            video_id: video_id.to_string(),
            transcript_id: DEFAULT_TRANSCRIPT_ID.to_string(),
            audio_gcs_uri: format!("gs://audio/{video_id}.flac"),
            user_id: None,
            operation_name: None,
        }
    }

    #[tokio::test]
    async fn test_missing_record_is_marked_failed_and_acknowledged() {
        let ledger = Arc::new(FakeLedger::default());
        let store = Arc::new(FakeStore::default());
        let recognizer = Arc::new(FakeRecognizer::default());
        let r = runner(&ledger, &store, &recognizer);

        let outcome = r.run(&job("v1")).await.unwrap();
        assert_eq!(outcome, TranscribeOutcome::RecordMissing);

        let record = ledger.transcript("v1", DEFAULT_TRANSCRIPT_ID).unwrap();
        assert_eq!(record.status, TranscriptStatus::Failed);
        assert!(recognizer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_done_record_is_a_no_op() {
        let ledger = Arc::new(FakeLedger::default());
        let mut record = Transcript::pending("v1", "en-US", "long");
        record.status = TranscriptStatus::Done;
        ledger.insert_transcript("v1", DEFAULT_TRANSCRIPT_ID, record);

        let store = Arc::new(FakeStore::default());
        let recognizer = Arc::new(FakeRecognizer::default());
        let r = runner(&ledger, &store, &recognizer);

        let outcome = r.run(&job("v1")).await.unwrap();
        assert_eq!(outcome, TranscribeOutcome::AlreadyDone);
        assert!(recognizer.calls().is_empty());
        assert!(!store.calls().iter().any(|c| c.starts_with("upload_transcript")));
    }

    #[tokio::test]
    async fn test_happy_path_persists_operation_before_polling() {
        let log = crate::testing::shared_log();
        let ledger = Arc::new(FakeLedger::with_log(log.clone()));
        ledger.insert_transcript(
            "v1",
            DEFAULT_TRANSCRIPT_ID,
            Transcript::pending("v1", "en-US", "long"),
        );
        let store = Arc::new(FakeStore::default());
        let recognizer = Arc::new(FakeRecognizer::with_log(log.clone()));
        let r = runner(&ledger, &store, &recognizer);

        let outcome = r.run(&job("v1")).await.unwrap();
        assert_eq!(
            outcome,
            TranscribeOutcome::Completed {
                segment_count: 1,
                duration_seconds: 4.0
            }
        );

        let record = ledger.transcript("v1", DEFAULT_TRANSCRIPT_ID).unwrap();
        assert_eq!(record.status, TranscriptStatus::Done);
        assert_eq!(record.segment_count, Some(1));
        assert_eq!(record.duration_seconds, Some(4.0));
        assert_eq!(record.gcs_path.as_deref(), Some("gs://transcripts/v1/transcript.json"));
        assert_eq!(record.operation_name.as_deref(), Some("operations/fake-op"));

        // The handle reached the ledger before the first poll
        let events = log.lock().unwrap().clone();
        let persisted = events.iter().position(|e| e.contains(":operation")).unwrap();
        let waited = events.iter().position(|e| e.starts_with("wait:")).unwrap();
        assert!(persisted < waited);
    }

    #[tokio::test]
    async fn test_redelivered_job_resumes_persisted_operation() {
        let ledger = Arc::new(FakeLedger::default());
        let mut record = Transcript::pending("v1", "en-US", "long");
        record.status = TranscriptStatus::Failed;
        record.operation_name = Some("operations/earlier".to_string());
        ledger.insert_transcript("v1", DEFAULT_TRANSCRIPT_ID, record);

        let store = Arc::new(FakeStore::default());
        let recognizer = Arc::new(FakeRecognizer::default());
        let r = runner(&ledger, &store, &recognizer);

        r.run(&job("v1")).await.unwrap();

        let calls = recognizer.calls();
        assert!(!calls.iter().any(|c| c.starts_with("start")));
        assert!(calls.contains(&"wait:operations/earlier".to_string()));
    }

    #[tokio::test]
    async fn test_recognizer_failure_marks_failed_and_propagates() {
        let ledger = Arc::new(FakeLedger::default());
        ledger.insert_transcript(
            "v1",
            DEFAULT_TRANSCRIPT_ID,
            Transcript::pending("v1", "en-US", "long"),
        );
        let store = Arc::new(FakeStore::default());
        let recognizer = Arc::new(FakeRecognizer::default());
        recognizer.fail_wait();
        let r = runner(&ledger, &store, &recognizer);

        let err = r.run(&job("v1")).await.unwrap_err();
        assert!(err.to_string().contains("recognition"));

        let record = ledger.transcript("v1", DEFAULT_TRANSCRIPT_ID).unwrap();
        assert_eq!(record.status, TranscriptStatus::Failed);
        assert!(record.error.is_some());
        // The handle survives for the next delivery to resume
        assert_eq!(record.operation_name.as_deref(), Some("operations/fake-op"));
    }
}
