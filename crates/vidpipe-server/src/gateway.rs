//! Trait seams in front of the external systems.
//!
//! The orchestrator and handlers only see these traits; production wires
//! them to GCS, Firestore, Pub/Sub, and Speech-to-Text, tests substitute
//! fakes. All methods return [`ApiError`] so callers compose with `?`.

use std::sync::Arc;

use async_trait::async_trait;

use vidpipe_firestore::{FirestoreClient, TranscriptRepository, VideoRepository};
use vidpipe_media::WorkDirs;
use vidpipe_models::{
    transcript_object_path, Transcript, TranscriptPayload, TranscriptSegment, TranscriptUpdate,
    Video, VideoStatus,
};
use vidpipe_queue::{PubSubPublisher, TranscriptionJobPayload};
use vidpipe_speech::SpeechClient;
use vidpipe_storage::{gs_uri, GcsClient};

use crate::config::ServiceConfig;
use crate::error::ApiResult;

// =============================================================================
// Traits
// =============================================================================

/// Blob storage plus the local media operations that feed it.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Fetch a raw upload into the local raw directory.
    async fn download_raw(&self, filename: &str) -> ApiResult<()>;

    /// Transcode a local raw file into the local processed directory.
    async fn transcode(&self, raw_filename: &str, processed_filename: &str) -> ApiResult<()>;

    /// Push a local processed file to the processed bucket, public-read.
    async fn upload_processed(&self, processed_filename: &str) -> ApiResult<()>;

    /// Extract recognizer-ready audio from a local processed file.
    async fn extract_audio(&self, processed_filename: &str, audio_filename: &str) -> ApiResult<()>;

    /// Push a local audio work file to the audio bucket; returns its
    /// `gs://` URI.
    async fn upload_audio(&self, audio_filename: &str) -> ApiResult<String>;

    /// Store the durable transcript artifact; returns its `gs://` URI.
    async fn upload_transcript(
        &self,
        video_id: &str,
        payload: &TranscriptPayload,
    ) -> ApiResult<String>;

    /// Remove a local raw work file. Missing files are fine.
    async fn remove_raw_file(&self, filename: &str) -> ApiResult<()>;

    /// Remove a local processed work file. Missing files are fine.
    async fn remove_processed_file(&self, filename: &str) -> ApiResult<()>;

    /// Remove a local audio work file. Missing files are fine.
    async fn remove_audio_file(&self, audio_filename: &str) -> ApiResult<()>;

    /// Health probe against the raw bucket.
    async fn probe_raw_bucket(&self) -> ApiResult<()>;

    /// Health probe against the processed bucket.
    async fn probe_processed_bucket(&self) -> ApiResult<()>;
}

/// The metadata ledger for videos and their transcripts.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// True when the video id has never been claimed.
    async fn is_new_video(&self, video_id: &str) -> ApiResult<bool>;

    /// Merge the populated fields into the video record.
    async fn set_video(&self, video_id: &str, video: &Video) -> ApiResult<()>;

    /// Move the video status, honoring the state machine.
    async fn set_video_status(&self, video_id: &str, status: VideoStatus) -> ApiResult<()>;

    async fn get_transcript(
        &self,
        video_id: &str,
        transcript_id: &str,
    ) -> ApiResult<Option<Transcript>>;

    async fn create_transcript(
        &self,
        transcript_id: &str,
        transcript: &Transcript,
    ) -> ApiResult<()>;

    async fn update_transcript(
        &self,
        video_id: &str,
        transcript_id: &str,
        update: TranscriptUpdate,
    ) -> ApiResult<()>;

    /// Health probe against the ledger backend.
    async fn probe(&self) -> ApiResult<()>;
}

/// Fan-out channel to the transcription worker.
#[async_trait]
pub trait JobPublisher: Send + Sync {
    /// Publish a transcription job; returns the message id.
    async fn publish_transcription_job(&self, job: &TranscriptionJobPayload) -> ApiResult<String>;
}

/// The long-running speech recognizer.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Submit a recognition request; returns the operation handle.
    async fn start(&self, audio_gcs_uri: &str, language: &str, model: &str) -> ApiResult<String>;

    /// Poll an operation to completion; returns timed segments and the
    /// overall audio duration in seconds.
    async fn wait(&self, operation_name: &str) -> ApiResult<(Vec<TranscriptSegment>, f64)>;
}

// =============================================================================
// Production implementations
// =============================================================================

/// [`MediaStore`] backed by GCS and local FFmpeg.
pub struct GcsMediaStore {
    gcs: GcsClient,
    dirs: WorkDirs,
    raw_bucket: String,
    processed_bucket: String,
    audio_bucket: String,
    transcripts_bucket: String,
}

impl GcsMediaStore {
    pub fn new(gcs: GcsClient, dirs: WorkDirs, config: &ServiceConfig) -> Self {
        Self {
            gcs,
            dirs,
            raw_bucket: config.raw_video_bucket.clone(),
            processed_bucket: config.processed_video_bucket.clone(),
            audio_bucket: config.audio_work_bucket.clone(),
            transcripts_bucket: config.transcripts_bucket.clone(),
        }
    }
}

#[async_trait]
impl MediaStore for GcsMediaStore {
    async fn download_raw(&self, filename: &str) -> ApiResult<()> {
        self.gcs
            .download_to_file(&self.raw_bucket, filename, self.dirs.raw_path(filename))
            .await?;
        Ok(())
    }

    async fn transcode(&self, raw_filename: &str, processed_filename: &str) -> ApiResult<()> {
        vidpipe_media::transcode_to_360p(
            self.dirs.raw_path(raw_filename),
            self.dirs.processed_path(processed_filename),
        )
        .await?;
        Ok(())
    }

    async fn upload_processed(&self, processed_filename: &str) -> ApiResult<()> {
        self.gcs
            .upload_file(
                &self.processed_bucket,
                processed_filename,
                self.dirs.processed_path(processed_filename),
                "video/mp4",
                true,
            )
            .await?;
        Ok(())
    }

    async fn extract_audio(&self, processed_filename: &str, audio_filename: &str) -> ApiResult<()> {
        vidpipe_media::extract_audio(
            self.dirs.processed_path(processed_filename),
            self.dirs.audio_path(audio_filename),
        )
        .await?;
        Ok(())
    }

    async fn upload_audio(&self, audio_filename: &str) -> ApiResult<String> {
        self.gcs
            .upload_file(
                &self.audio_bucket,
                audio_filename,
                self.dirs.audio_path(audio_filename),
                "audio/flac",
                false,
            )
            .await?;
        Ok(gs_uri(&self.audio_bucket, audio_filename))
    }

    async fn upload_transcript(
        &self,
        video_id: &str,
        payload: &TranscriptPayload,
    ) -> ApiResult<String> {
        let object = transcript_object_path(video_id);
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| crate::error::ApiError::internal(e.to_string()))?;
        self.gcs
            .upload_bytes(&self.transcripts_bucket, &object, bytes, "application/json")
            .await?;
        Ok(gs_uri(&self.transcripts_bucket, &object))
    }

    async fn remove_raw_file(&self, filename: &str) -> ApiResult<()> {
        vidpipe_media::remove_file_if_exists(self.dirs.raw_path(filename)).await?;
        Ok(())
    }

    async fn remove_processed_file(&self, filename: &str) -> ApiResult<()> {
        vidpipe_media::remove_file_if_exists(self.dirs.processed_path(filename)).await?;
        Ok(())
    }

    async fn remove_audio_file(&self, audio_filename: &str) -> ApiResult<()> {
        vidpipe_media::remove_file_if_exists(self.dirs.audio_path(audio_filename)).await?;
        Ok(())
    }

    async fn probe_raw_bucket(&self) -> ApiResult<()> {
        self.gcs.bucket_exists(&self.raw_bucket).await?;
        Ok(())
    }

    async fn probe_processed_bucket(&self) -> ApiResult<()> {
        self.gcs.bucket_exists(&self.processed_bucket).await?;
        Ok(())
    }
}

/// [`Ledger`] backed by Firestore.
pub struct FirestoreLedger {
    client: FirestoreClient,
    videos: VideoRepository,
    transcripts: TranscriptRepository,
}

impl FirestoreLedger {
    pub fn new(client: FirestoreClient) -> Self {
        Self {
            videos: VideoRepository::new(client.clone()),
            transcripts: TranscriptRepository::new(client.clone()),
            client,
        }
    }
}

#[async_trait]
impl Ledger for FirestoreLedger {
    async fn is_new_video(&self, video_id: &str) -> ApiResult<bool> {
        Ok(self.videos.is_new(video_id).await?)
    }

    async fn set_video(&self, video_id: &str, video: &Video) -> ApiResult<()> {
        Ok(self.videos.set(video_id, video).await?)
    }

    async fn set_video_status(&self, video_id: &str, status: VideoStatus) -> ApiResult<()> {
        Ok(self.videos.set_status(video_id, status).await?)
    }

    async fn get_transcript(
        &self,
        video_id: &str,
        transcript_id: &str,
    ) -> ApiResult<Option<Transcript>> {
        Ok(self.transcripts.get(video_id, transcript_id).await?)
    }

    async fn create_transcript(
        &self,
        transcript_id: &str,
        transcript: &Transcript,
    ) -> ApiResult<()> {
        Ok(self.transcripts.create(transcript_id, transcript).await?)
    }

    async fn update_transcript(
        &self,
        video_id: &str,
        transcript_id: &str,
        update: TranscriptUpdate,
    ) -> ApiResult<()> {
        Ok(self
            .transcripts
            .update(video_id, transcript_id, update)
            .await?)
    }

    async fn probe(&self) -> ApiResult<()> {
        // A read that comes back 404 still proves the backend is reachable
        self.client.get_document("videos/_health").await?;
        Ok(())
    }
}

/// [`JobPublisher`] backed by a Pub/Sub topic.
pub struct PubSubJobPublisher {
    publisher: PubSubPublisher,
    topic: String,
}

impl PubSubJobPublisher {
    pub fn new(publisher: PubSubPublisher, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl JobPublisher for PubSubJobPublisher {
    async fn publish_transcription_job(&self, job: &TranscriptionJobPayload) -> ApiResult<String> {
        Ok(self.publisher.publish(&self.topic, job).await?)
    }
}

/// [`Recognizer`] backed by the Speech-to-Text API.
pub struct GoogleRecognizer {
    client: SpeechClient,
}

impl GoogleRecognizer {
    pub fn new(client: SpeechClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Recognizer for GoogleRecognizer {
    async fn start(&self, audio_gcs_uri: &str, language: &str, model: &str) -> ApiResult<String> {
        Ok(self
            .client
            .start_recognition(audio_gcs_uri, language, model)
            .await?)
    }

    async fn wait(&self, operation_name: &str) -> ApiResult<(Vec<TranscriptSegment>, f64)> {
        let response = self.client.wait_for_transcript(operation_name).await?;
        Ok(vidpipe_speech::decode_response(&response))
    }
}

pub type SharedMediaStore = Arc<dyn MediaStore>;
pub type SharedLedger = Arc<dyn Ledger>;
pub type SharedJobPublisher = Arc<dyn JobPublisher>;
pub type SharedRecognizer = Arc<dyn Recognizer>;
