//! Speech-to-Text REST client with bounded operation polling.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use vidpipe_gcp::{TokenCache, CLOUD_PLATFORM_SCOPE};

use crate::error::{SpeechError, SpeechResult};
use crate::types::{
    recognition_model, LongRunningRecognizeRequest, LongRunningRecognizeResponse, Operation,
    RecognitionAudio, RecognitionConfig,
};

const API_BASE: &str = "https://speech.googleapis.com/v1";

/// How long to wait between operation polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// How many polls before giving up (60 minutes at 30s intervals).
pub const MAX_POLL_ATTEMPTS: u32 = 120;

/// Speech-to-Text client.
#[derive(Clone)]
pub struct SpeechClient {
    http: Client,
    token_cache: Arc<TokenCache>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl SpeechClient {
    /// Create a new client with a shared token cache.
    pub fn new(token_cache: Arc<TokenCache>) -> SpeechResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("vidpipe-speech/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SpeechError::Network)?;

        Ok(Self {
            http,
            token_cache,
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
        })
    }

    /// Create from ambient credentials.
    pub async fn from_env() -> SpeechResult<Self> {
        let auth = vidpipe_gcp::default_provider()
            .await
            .map_err(|e| SpeechError::auth_error(e.to_string()))?;
        Self::new(Arc::new(TokenCache::new(auth, CLOUD_PLATFORM_SCOPE)))
    }

    /// Override the polling schedule. Used by tests.
    pub fn with_poll_schedule(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    async fn token(&self) -> SpeechResult<String> {
        self.token_cache
            .get_token()
            .await
            .map_err(|e| SpeechError::auth_error(e.to_string()))
    }

    /// Submit a long-running recognition request for a `gs://` audio file.
    ///
    /// Returns the operation name, which must be persisted before the first
    /// poll so a crashed worker can resume instead of re-submitting.
    pub async fn start_recognition(
        &self,
        audio_gcs_uri: &str,
        language: &str,
        model: &str,
    ) -> SpeechResult<String> {
        let request = LongRunningRecognizeRequest {
            config: RecognitionConfig {
                encoding: "FLAC".to_string(),
                language_code: language.to_string(),
                model: recognition_model(model).to_string(),
                enable_automatic_punctuation: true,
                enable_word_time_offsets: true,
                profanity_filter: false,
            },
            audio: RecognitionAudio {
                uri: audio_gcs_uri.to_string(),
            },
        };

        let url = format!("{}/speech:longrunningrecognize", API_BASE);

        let mut response = self
            .http
            .post(&url)
            .bearer_auth(self.token().await?)
            .json(&request)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.token_cache.invalidate().await;
            response = self
                .http
                .post(&url)
                .bearer_auth(self.token().await?)
                .json(&request)
                .send()
                .await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::start_failed(format!(
                "{} returned {}: {}",
                url, status, body
            )));
        }

        let operation: Operation = response.json().await?;
        let name = operation.name.ok_or(SpeechError::MissingOperationName)?;

        info!(
            operation = %name,
            audio_gcs_uri,
            language,
            "Started recognition operation"
        );
        Ok(name)
    }

    /// Fetch the current state of an operation.
    pub async fn get_operation(&self, operation_name: &str) -> SpeechResult<Operation> {
        let url = format!("{}/operations/{}", API_BASE, operation_name.trim_start_matches("operations/"));

        let mut response = self
            .http
            .get(&url)
            .bearer_auth(self.token().await?)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.token_cache.invalidate().await;
            response = self
                .http
                .get(&url)
                .bearer_auth(self.token().await?)
                .send()
                .await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::InvalidResponse(format!(
                "{} returned {}: {}",
                url, status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Poll an operation until it completes, fails, or the budget runs out.
    pub async fn wait_for_transcript(
        &self,
        operation_name: &str,
    ) -> SpeechResult<LongRunningRecognizeResponse> {
        for attempt in 1..=self.max_poll_attempts {
            let operation = self.get_operation(operation_name).await?;

            if operation.done {
                if let Some(error) = operation.error {
                    return Err(SpeechError::operation_failed(
                        operation_name,
                        error.message.unwrap_or_else(|| {
                            format!("recognizer error code {}", error.code.unwrap_or(0))
                        }),
                    ));
                }
                return operation
                    .response
                    .ok_or_else(|| SpeechError::MissingResponse(operation_name.to_string()));
            }

            let progress = operation
                .metadata
                .and_then(|m| m.progress_percent)
                .unwrap_or(0);
            debug!(
                operation = %operation_name,
                attempt,
                progress,
                "Recognition still running"
            );

            tokio::time::sleep(self.poll_interval).await;
        }

        Err(SpeechError::PollTimeout {
            operation: operation_name.to_string(),
            attempts: self.max_poll_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_budget_is_an_hour() {
        assert_eq!(POLL_INTERVAL, Duration::from_secs(30));
        assert_eq!(MAX_POLL_ATTEMPTS, 120);
        assert_eq!(POLL_INTERVAL * MAX_POLL_ATTEMPTS, Duration::from_secs(3600));
    }

    #[test]
    fn test_recognize_request_wire_format() {
        let request = LongRunningRecognizeRequest {
            config: RecognitionConfig {
                encoding: "FLAC".to_string(),
                language_code: "en-US".to_string(),
                model: recognition_model("long").to_string(),
                enable_automatic_punctuation: true,
                enable_word_time_offsets: true,
                profanity_filter: false,
            },
            audio: RecognitionAudio {
                uri: "gs://audio/v1.flac".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["config"]["languageCode"], "en-US");
        assert_eq!(json["config"]["model"], "latest_long");
        assert_eq!(json["config"]["enableWordTimeOffsets"], true);
        assert_eq!(json["audio"]["uri"], "gs://audio/v1.flac");
    }
}
