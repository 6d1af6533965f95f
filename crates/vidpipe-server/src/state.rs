//! Shared application state.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::info;

use vidpipe_firestore::{FirestoreClient, FirestoreConfig};
use vidpipe_gcp::{TokenCache, CLOUD_PLATFORM_SCOPE, DATASTORE_SCOPE};
use vidpipe_media::WorkDirs;
use vidpipe_queue::PubSubPublisher;
use vidpipe_speech::SpeechClient;
use vidpipe_storage::GcsClient;

use crate::config::ServiceConfig;
use crate::gateway::{
    FirestoreLedger, GcsMediaStore, GoogleRecognizer, PubSubJobPublisher, SharedJobPublisher,
    SharedLedger, SharedMediaStore, SharedRecognizer,
};
use crate::processor::{ProcessorSettings, VideoProcessor};
use crate::transcription::TranscriptionRunner;

/// State shared by all handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub storage: SharedMediaStore,
    pub ledger: SharedLedger,
    pub publisher: SharedJobPublisher,
    pub recognizer: SharedRecognizer,
    pub processor: Arc<VideoProcessor>,
    pub transcription: Arc<TranscriptionRunner>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the production gateways from ambient credentials.
    pub async fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        let auth = vidpipe_gcp::default_provider()
            .await
            .context("failed to discover GCP credentials")?;
        let platform_tokens = Arc::new(TokenCache::new(auth.clone(), CLOUD_PLATFORM_SCOPE));
        let datastore_tokens = Arc::new(TokenCache::new(auth, DATASTORE_SCOPE));

        let dirs = WorkDirs::under(&config.work_dir);
        dirs.ensure()
            .await
            .context("failed to create work directories")?;

        let gcs = GcsClient::new(platform_tokens.clone())?;
        let firestore = FirestoreClient::new(FirestoreConfig::from_env()?, datastore_tokens)?;
        let speech = SpeechClient::new(platform_tokens.clone())?;
        let pubsub = PubSubPublisher::new(config.project_id.clone(), platform_tokens)?;

        let storage: SharedMediaStore = Arc::new(GcsMediaStore::new(gcs, dirs, &config));
        let ledger: SharedLedger = Arc::new(FirestoreLedger::new(firestore));
        let publisher: SharedJobPublisher =
            Arc::new(PubSubJobPublisher::new(pubsub, config.transcription_topic.clone()));
        let recognizer: SharedRecognizer = Arc::new(GoogleRecognizer::new(speech));

        info!(
            project_id = %config.project_id,
            raw_bucket = %config.raw_video_bucket,
            processed_bucket = %config.processed_video_bucket,
            topic = %config.transcription_topic,
            transcription_enabled = config.enable_transcription,
            "Application state ready"
        );

        Ok(Self::with_gateways(config, storage, ledger, publisher, recognizer))
    }

    /// Assemble state from explicit gateways. Tests wire fakes here.
    pub fn with_gateways(
        config: ServiceConfig,
        storage: SharedMediaStore,
        ledger: SharedLedger,
        publisher: SharedJobPublisher,
        recognizer: SharedRecognizer,
    ) -> Self {
        let processor = Arc::new(VideoProcessor::new(
            storage.clone(),
            ledger.clone(),
            publisher.clone(),
            ProcessorSettings {
                max_attempts: config.max_attempts,
                enable_transcription: config.enable_transcription,
                speech_language: config.speech_language.clone(),
                speech_model: config.speech_model.clone(),
            },
        ));
        let transcription = Arc::new(TranscriptionRunner::new(
            ledger.clone(),
            storage.clone(),
            recognizer.clone(),
            config.speech_language.clone(),
            config.speech_model.clone(),
        ));

        Self {
            config: Arc::new(config),
            storage,
            ledger,
            publisher,
            recognizer,
            processor,
            transcription,
            started_at: Instant::now(),
        }
    }
}
