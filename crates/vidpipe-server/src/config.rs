//! Service configuration from environment variables.

use std::path::PathBuf;

use anyhow::Context;

/// Default Pub/Sub topic for transcription jobs.
const DEFAULT_TRANSCRIPTION_TOPIC: &str = "transcription-jobs";

/// Server and pipeline configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// GCP project id
    pub project_id: String,
    /// Bucket receiving raw uploads
    pub raw_video_bucket: String,
    /// Bucket serving transcoded outputs (public-read objects)
    pub processed_video_bucket: String,
    /// Bucket holding audio work files for the recognizer
    pub audio_work_bucket: String,
    /// Bucket holding transcript artifacts
    pub transcripts_bucket: String,
    /// Pub/Sub topic for transcription jobs
    pub transcription_topic: String,
    /// Recognition model ("long" or "short")
    pub speech_model: String,
    /// Recognition language code
    pub speech_language: String,
    /// Whether the transcription fan-out runs after a transcode
    pub enable_transcription: bool,
    /// Top-level processing attempts per video
    pub max_attempts: u32,
    /// Root for local scratch directories
    pub work_dir: PathBuf,
    /// Deployment region, identity only
    pub region: String,
    /// Service name, identity only
    pub service_name: String,
    /// Deployment environment name ("development", "production", ...)
    pub environment: String,
    /// Service version reported by /health
    pub version: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Bucket names and the project id are deliberately required, with no
    /// baked-in deployment defaults: a misconfigured instance fails at
    /// startup instead of silently reading from or writing to another
    /// deployment's buckets. Everything else falls back to a documented
    /// default.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env_or("API_HOST", "0.0.0.0"),
            port: env_parsed("PORT", 3000),
            project_id: required("PROJECT_ID")?,
            raw_video_bucket: required("RAW_VIDEO_BUCKET_NAME")?,
            processed_video_bucket: required("PROCESSED_VIDEO_BUCKET_NAME")?,
            audio_work_bucket: required("AUDIO_WORK_BUCKET_NAME")?,
            transcripts_bucket: required("TRANSCRIPTS_BUCKET_NAME")?,
            transcription_topic: env_or("TRANSCRIPTION_TOPIC_NAME", DEFAULT_TRANSCRIPTION_TOPIC),
            speech_model: env_or("SPEECH_TO_TEXT_MODEL", "long"),
            speech_language: env_or("SPEECH_TO_TEXT_LANGUAGE", "en-US"),
            enable_transcription: env_bool("ENABLE_TRANSCRIPTION", true),
            max_attempts: env_parsed("PROCESSING_MAX_ATTEMPTS", 3),
            work_dir: PathBuf::from(env_or("WORK_DIR", ".")),
            region: env_or("REGION", "us-central1"),
            service_name: env_or("SERVICE_NAME", "vidpipe-server"),
            environment: env_or("ENVIRONMENT", "development"),
            version: env_or("SERVICE_VERSION", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &str) -> anyhow::Result<String> {
    let value = std::env::var(name).with_context(|| format!("{name} must be set"))?;
    anyhow::ensure!(!value.is_empty(), "{name} cannot be empty");
    Ok(value)
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}
