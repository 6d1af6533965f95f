//! Video processing orchestrator.
//!
//! Sequences download → transcode → upload → ledger update → optional
//! transcription fan-out → cleanup, with a bounded top-level retry loop.
//! Only this loop retries; a transient failure in any sub-step consumes a
//! whole attempt.

use std::sync::Arc;

use tracing::{error, info, warn};

use vidpipe_models::{
    audio_work_name, processed_video_name, uid_from_video_id, video_id_from_filename, Transcript,
    TranscriptStatus, TranscriptUpdate, Video, VideoStatus, DEFAULT_TRANSCRIPT_ID,
};
use vidpipe_queue::TranscriptionJobPayload;

use crate::error::ApiResult;
use crate::gateway::{JobPublisher, Ledger, MediaStore};

/// Orchestrator tunables, lifted from [`crate::ServiceConfig`].
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub max_attempts: u32,
    pub enable_transcription: bool,
    pub speech_language: String,
    pub speech_model: String,
}

/// Runs the processing pipeline for one raw upload at a time.
///
/// Holds no per-job state; concurrent invocations are independent.
pub struct VideoProcessor {
    storage: Arc<dyn MediaStore>,
    ledger: Arc<dyn Ledger>,
    publisher: Arc<dyn JobPublisher>,
    settings: ProcessorSettings,
}

impl VideoProcessor {
    pub fn new(
        storage: Arc<dyn MediaStore>,
        ledger: Arc<dyn Ledger>,
        publisher: Arc<dyn JobPublisher>,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            storage,
            ledger,
            publisher,
            settings,
        }
    }

    /// Process one raw upload to completion or exhaustion.
    ///
    /// On exhausted attempts the video is marked `failed` and the last
    /// error is returned to the caller, who decides how to acknowledge.
    pub async fn process(&self, raw_filename: &str) -> ApiResult<()> {
        let video_id = video_id_from_filename(raw_filename);
        let processed_filename = processed_video_name(raw_filename);
        let max_attempts = self.settings.max_attempts.max(1);

        let mut last_error = None;
        for attempt in 1..=max_attempts {
            info!(video_id, attempt, max_attempts, "Processing video");
            crate::metrics::record_processing_attempt();

            match self.run_attempt(raw_filename, &processed_filename, video_id).await {
                Ok(()) => {
                    self.cleanup(raw_filename, &processed_filename).await;
                    info!(video_id, attempt, "Video processed");
                    crate::metrics::record_video_outcome(true);
                    return Ok(());
                }
                Err(e) => {
                    warn!(video_id, attempt, error = %e, "Processing attempt failed");
                    self.cleanup(raw_filename, &processed_filename).await;
                    last_error = Some(e);
                }
            }
        }

        // The ledger write must not mask the pipeline error
        if let Err(e) = self.ledger.set_video_status(video_id, VideoStatus::Failed).await {
            error!(video_id, error = %e, "Failed to record terminal failure");
        }

        let last_error =
            last_error.unwrap_or_else(|| crate::error::ApiError::internal("no attempts ran"));
        error!(video_id, error = %last_error, "Processing attempts exhausted");
        crate::metrics::record_video_outcome(false);
        Err(last_error)
    }

    /// One full pipeline attempt. The transcription fan-out is non-fatal:
    /// its failure is recorded on the transcript record, never here.
    async fn run_attempt(
        &self,
        raw_filename: &str,
        processed_filename: &str,
        video_id: &str,
    ) -> ApiResult<()> {
        self.storage.download_raw(raw_filename).await?;
        self.storage.transcode(raw_filename, processed_filename).await?;
        self.storage.upload_processed(processed_filename).await?;

        self.ledger
            .set_video(
                video_id,
                &Video {
                    filename: Some(processed_filename.to_string()),
                    status: Some(VideoStatus::Processed),
                    ..Default::default()
                },
            )
            .await?;

        if self.settings.enable_transcription {
            if let Err(e) = self.transcription_fanout(video_id, processed_filename).await {
                error!(
                    video_id,
                    error = %e,
                    "Transcription fan-out failed; video processing unaffected"
                );
            }
        }

        Ok(())
    }

    /// Kick off the asynchronous transcription pipeline for a processed
    /// video: extract audio, stage it in the work bucket, register a
    /// `pending` transcript, publish the job, mark it `running`.
    async fn transcription_fanout(
        &self,
        video_id: &str,
        processed_filename: &str,
    ) -> ApiResult<()> {
        let uid = uid_from_video_id(video_id);
        let audio_filename = audio_work_name(video_id);

        let result = self
            .fanout_steps(video_id, uid, processed_filename, &audio_filename)
            .await;

        if let Err(e) = &result {
            let update = TranscriptUpdate {
                status: Some(TranscriptStatus::Failed),
                error: Some(e.to_string()),
                ..Default::default()
            };
            if let Err(mark) = self
                .ledger
                .update_transcript(video_id, DEFAULT_TRANSCRIPT_ID, update)
                .await
            {
                error!(video_id, error = %mark, "Failed to record transcription failure");
            }
        }

        // The staged copy in the work bucket is the durable one
        if let Err(e) = self.storage.remove_audio_file(&audio_filename).await {
            warn!(video_id, error = %e, "Failed to remove audio work file");
        }

        result
    }

    async fn fanout_steps(
        &self,
        video_id: &str,
        uid: &str,
        processed_filename: &str,
        audio_filename: &str,
    ) -> ApiResult<()> {
        self.storage.extract_audio(processed_filename, audio_filename).await?;
        let audio_gcs_uri = self.storage.upload_audio(audio_filename).await?;

        let transcript = Transcript::pending(
            video_id,
            &self.settings.speech_language,
            &self.settings.speech_model,
        )
        .with_audio_uri(&audio_gcs_uri)
        .with_user_id(uid);
        self.ledger
            .create_transcript(DEFAULT_TRANSCRIPT_ID, &transcript)
            .await?;

        let job = TranscriptionJobPayload {
            video_id: video_id.to_string(),
            transcript_id: DEFAULT_TRANSCRIPT_ID.to_string(),
            audio_gcs_uri,
            user_id: Some(uid.to_string()),
            operation_name: None,
        };
        let message_id = self.publisher.publish_transcription_job(&job).await?;
        info!(video_id, message_id, "Published transcription job");

        self.ledger
            .update_transcript(
                video_id,
                DEFAULT_TRANSCRIPT_ID,
                TranscriptUpdate {
                    status: Some(TranscriptStatus::Running),
                    ..Default::default()
                },
            )
            .await?;

        Ok(())
    }

    /// Remove both local temp files concurrently. Never fails the job.
    async fn cleanup(&self, raw_filename: &str, processed_filename: &str) {
        let (raw, processed) = tokio::join!(
            self.storage.remove_raw_file(raw_filename),
            self.storage.remove_processed_file(processed_filename),
        );
        if let Err(e) = raw {
            warn!(raw_filename, error = %e, "Failed to remove raw work file");
        }
        if let Err(e) = processed {
            warn!(processed_filename, error = %e, "Failed to remove processed work file");
        }
    }
}
