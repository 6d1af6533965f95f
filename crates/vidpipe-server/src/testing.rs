//! In-memory fakes for the gateway traits.
//!
//! Each fake records its calls into an event log. Fakes constructed with
//! [`shared_log`] interleave their entries, which lets tests assert
//! ordering across systems (e.g. the operation handle is persisted before
//! the first poll).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vidpipe_models::{
    Transcript, TranscriptPayload, TranscriptSegment, TranscriptStatus, TranscriptUpdate, Video,
    VideoStatus,
};
use vidpipe_queue::TranscriptionJobPayload;

use crate::error::{ApiError, ApiResult};
use crate::gateway::{JobPublisher, Ledger, MediaStore, Recognizer};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn shared_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Config for handler tests. Transcription is off by default; tests that
/// exercise the fan-out flip it on.
pub fn test_config() -> crate::config::ServiceConfig {
    crate::config::ServiceConfig {
        host: "0.0.0.0".to_string(),
        port: 3000,
        project_id: "test".to_string(),
        raw_video_bucket: "raw".to_string(),
        processed_video_bucket: "processed".to_string(),
        audio_work_bucket: "audio".to_string(),
        transcripts_bucket: "transcripts".to_string(),
        transcription_topic: "transcription-jobs".to_string(),
        speech_model: "long".to_string(),
        speech_language: "en-US".to_string(),
        enable_transcription: false,
        max_attempts: 3,
        work_dir: std::path::PathBuf::from("."),
        region: "test-region".to_string(),
        service_name: "vidpipe-server".to_string(),
        environment: "test".to_string(),
        version: "1.2.3".to_string(),
    }
}

/// App state wired entirely to fakes.
pub fn test_state(store: Arc<FakeStore>, ledger: Arc<FakeLedger>) -> crate::state::AppState {
    crate::state::AppState::with_gateways(
        test_config(),
        store,
        ledger,
        Arc::new(FakePublisher::default()),
        Arc::new(FakeRecognizer::default()),
    )
}

fn push(log: &EventLog, entry: String) {
    log.lock().unwrap().push(entry);
}

// =============================================================================
// FakeStore
// =============================================================================

#[derive(Default)]
pub struct FakeStore {
    log: EventLog,
    fail_download: AtomicBool,
    fail_upload_once: AtomicBool,
    fail_extract: AtomicBool,
    fail_raw_probe: AtomicBool,
    fail_processed_probe: AtomicBool,
}

impl FakeStore {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn fail_download_always(&self) {
        self.fail_download.store(true, Ordering::SeqCst);
    }

    pub fn fail_upload_once(&self) {
        self.fail_upload_once.store(true, Ordering::SeqCst);
    }

    pub fn fail_extract_always(&self) {
        self.fail_extract.store(true, Ordering::SeqCst);
    }

    pub fn fail_raw_probe(&self) {
        self.fail_raw_probe.store(true, Ordering::SeqCst);
    }

    pub fn fail_processed_probe(&self) {
        self.fail_processed_probe.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaStore for FakeStore {
    async fn download_raw(&self, filename: &str) -> ApiResult<()> {
        push(&self.log, format!("download_raw:{filename}"));
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(ApiError::internal("download failed (injected)"));
        }
        Ok(())
    }

    async fn transcode(&self, raw_filename: &str, processed_filename: &str) -> ApiResult<()> {
        push(&self.log, format!("transcode:{raw_filename}->{processed_filename}"));
        Ok(())
    }

    async fn upload_processed(&self, processed_filename: &str) -> ApiResult<()> {
        push(&self.log, format!("upload_processed:{processed_filename}"));
        if self.fail_upload_once.swap(false, Ordering::SeqCst) {
            return Err(ApiError::internal("upload failed (injected)"));
        }
        Ok(())
    }

    async fn extract_audio(&self, processed_filename: &str, audio_filename: &str) -> ApiResult<()> {
        push(&self.log, format!("extract_audio:{processed_filename}->{audio_filename}"));
        if self.fail_extract.load(Ordering::SeqCst) {
            return Err(ApiError::internal("audio extraction failed (injected)"));
        }
        Ok(())
    }

    async fn upload_audio(&self, audio_filename: &str) -> ApiResult<String> {
        push(&self.log, format!("upload_audio:{audio_filename}"));
        Ok(format!("gs://audio/{audio_filename}"))
    }

    async fn upload_transcript(
        &self,
        video_id: &str,
        _payload: &TranscriptPayload,
    ) -> ApiResult<String> {
        push(&self.log, format!("upload_transcript:{video_id}"));
        Ok(format!("gs://transcripts/{video_id}/transcript.json"))
    }

    async fn remove_raw_file(&self, filename: &str) -> ApiResult<()> {
        push(&self.log, format!("remove_raw:{filename}"));
        Ok(())
    }

    async fn remove_processed_file(&self, filename: &str) -> ApiResult<()> {
        push(&self.log, format!("remove_processed:{filename}"));
        Ok(())
    }

    async fn remove_audio_file(&self, audio_filename: &str) -> ApiResult<()> {
        push(&self.log, format!("remove_audio:{audio_filename}"));
        Ok(())
    }

    async fn probe_raw_bucket(&self) -> ApiResult<()> {
        if self.fail_raw_probe.load(Ordering::SeqCst) {
            return Err(ApiError::internal("raw bucket unreachable (injected)"));
        }
        Ok(())
    }

    async fn probe_processed_bucket(&self) -> ApiResult<()> {
        if self.fail_processed_probe.load(Ordering::SeqCst) {
            return Err(ApiError::internal("processed bucket unreachable (injected)"));
        }
        Ok(())
    }
}

// =============================================================================
// FakeLedger
// =============================================================================

#[derive(Default)]
pub struct FakeLedger {
    log: EventLog,
    videos: Mutex<HashMap<String, Video>>,
    transcripts: Mutex<HashMap<(String, String), Transcript>>,
    fail_probe: AtomicBool,
}

impl FakeLedger {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn fail_probe(&self) {
        self.fail_probe.store(true, Ordering::SeqCst);
    }

    pub fn video(&self, video_id: &str) -> Option<Video> {
        self.videos.lock().unwrap().get(video_id).cloned()
    }

    pub fn insert_video(&self, video_id: &str, video: Video) {
        self.videos.lock().unwrap().insert(video_id.to_string(), video);
    }

    pub fn transcript(&self, video_id: &str, transcript_id: &str) -> Option<Transcript> {
        self.transcripts
            .lock()
            .unwrap()
            .get(&(video_id.to_string(), transcript_id.to_string()))
            .cloned()
    }

    pub fn insert_transcript(&self, video_id: &str, transcript_id: &str, transcript: Transcript) {
        self.transcripts
            .lock()
            .unwrap()
            .insert((video_id.to_string(), transcript_id.to_string()), transcript);
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn is_new_video(&self, video_id: &str) -> ApiResult<bool> {
        push(&self.log, format!("is_new:{video_id}"));
        Ok(self
            .video(video_id)
            .map(|v| v.is_new())
            .unwrap_or(true))
    }

    async fn set_video(&self, video_id: &str, video: &Video) -> ApiResult<()> {
        push(&self.log, format!("set_video:{video_id}"));
        let mut videos = self.videos.lock().unwrap();
        let entry = videos.entry(video_id.to_string()).or_default();
        // Merge semantics: only populated fields land
        if video.id.is_some() {
            entry.id = video.id.clone();
        }
        if video.uid.is_some() {
            entry.uid = video.uid.clone();
        }
        if video.filename.is_some() {
            entry.filename = video.filename.clone();
        }
        if video.status.is_some() {
            entry.status = video.status;
        }
        if video.title.is_some() {
            entry.title = video.title.clone();
        }
        if video.description.is_some() {
            entry.description = video.description.clone();
        }
        Ok(())
    }

    async fn set_video_status(&self, video_id: &str, status: VideoStatus) -> ApiResult<()> {
        push(&self.log, format!("set_status:{video_id}:{status}"));
        self.videos
            .lock()
            .unwrap()
            .entry(video_id.to_string())
            .or_default()
            .status = Some(status);
        Ok(())
    }

    async fn get_transcript(
        &self,
        video_id: &str,
        transcript_id: &str,
    ) -> ApiResult<Option<Transcript>> {
        push(&self.log, format!("get_transcript:{video_id}:{transcript_id}"));
        Ok(self.transcript(video_id, transcript_id))
    }

    async fn create_transcript(
        &self,
        transcript_id: &str,
        transcript: &Transcript,
    ) -> ApiResult<()> {
        push(
            &self.log,
            format!("create_transcript:{}:{transcript_id}", transcript.video_id),
        );
        self.insert_transcript(&transcript.video_id, transcript_id, transcript.clone());
        Ok(())
    }

    async fn update_transcript(
        &self,
        video_id: &str,
        transcript_id: &str,
        update: TranscriptUpdate,
    ) -> ApiResult<()> {
        let mut entry = format!("update_transcript:{video_id}:{transcript_id}");
        if let Some(status) = update.status {
            entry.push_str(&format!(":status={status}"));
        }
        if update.operation_name.is_some() {
            entry.push_str(":operation");
        }
        push(&self.log, entry);

        let mut transcripts = self.transcripts.lock().unwrap();
        let key = (video_id.to_string(), transcript_id.to_string());
        let record = transcripts.entry(key).or_insert_with(|| Transcript {
            video_id: video_id.to_string(),
            status: update.status.unwrap_or(TranscriptStatus::Pending),
            language: String::new(),
            model: String::new(),
            operation_name: None,
            gcs_path: None,
            segment_count: None,
            duration_seconds: None,
            created_at: None,
            completed_at: None,
            error: None,
            audio_gcs_uri: None,
            user_id: None,
        });
        if let Some(status) = update.status {
            record.status = status;
        }
        if update.operation_name.is_some() {
            record.operation_name = update.operation_name;
        }
        if update.gcs_path.is_some() {
            record.gcs_path = update.gcs_path;
        }
        if update.segment_count.is_some() {
            record.segment_count = update.segment_count;
        }
        if update.duration_seconds.is_some() {
            record.duration_seconds = update.duration_seconds;
        }
        if update.completed_at.is_some() {
            record.completed_at = update.completed_at;
        }
        if update.error.is_some() {
            record.error = update.error;
        }
        Ok(())
    }

    async fn probe(&self) -> ApiResult<()> {
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(ApiError::internal("ledger unreachable (injected)"));
        }
        Ok(())
    }
}

// =============================================================================
// FakePublisher
// =============================================================================

#[derive(Default)]
pub struct FakePublisher {
    jobs: Mutex<Vec<TranscriptionJobPayload>>,
    fail: AtomicBool,
}

impl FakePublisher {
    pub fn published(&self) -> Vec<TranscriptionJobPayload> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn fail_publish(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobPublisher for FakePublisher {
    async fn publish_transcription_job(&self, job: &TranscriptionJobPayload) -> ApiResult<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::internal("publish failed (injected)"));
        }
        self.jobs.lock().unwrap().push(job.clone());
        Ok("fake-message-id".to_string())
    }
}

// =============================================================================
// FakeRecognizer
// =============================================================================

#[derive(Default)]
pub struct FakeRecognizer {
    log: EventLog,
    fail_wait: AtomicBool,
}

impl FakeRecognizer {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn fail_wait(&self) {
        self.fail_wait.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Recognizer for FakeRecognizer {
    async fn start(&self, audio_gcs_uri: &str, _language: &str, _model: &str) -> ApiResult<String> {
        push(&self.log, format!("start:{audio_gcs_uri}"));
        Ok("operations/fake-op".to_string())
    }

    async fn wait(&self, operation_name: &str) -> ApiResult<(Vec<TranscriptSegment>, f64)> {
        push(&self.log, format!("wait:{operation_name}"));
        if self.fail_wait.load(Ordering::SeqCst) {
            return Err(ApiError::internal("recognition failed (injected)"));
        }
        Ok((
            vec![TranscriptSegment {
                text: "Hello world".to_string(),
                start_time: 0.0,
                end_time: 4.0,
                confidence: Some(0.92),
            }],
            4.0,
        ))
    }
}
