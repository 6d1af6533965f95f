//! Pub/Sub topic publisher.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use vidpipe_gcp::{TokenCache, CLOUD_PLATFORM_SCOPE};

use crate::error::{QueueError, QueueResult};

const API_BASE: &str = "https://pubsub.googleapis.com/v1";

#[derive(Debug, Serialize)]
struct PublishRequest {
    messages: Vec<PublishMessage>,
}

#[derive(Debug, Serialize)]
struct PublishMessage {
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    message_ids: Vec<String>,
}

/// Publishes JSON payloads to a Pub/Sub topic.
#[derive(Clone)]
pub struct PubSubPublisher {
    http: Client,
    token_cache: Arc<TokenCache>,
    project_id: String,
}

impl PubSubPublisher {
    /// Create a new publisher with a shared token cache.
    pub fn new(project_id: impl Into<String>, token_cache: Arc<TokenCache>) -> QueueResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("vidpipe-queue/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(QueueError::Network)?;

        Ok(Self {
            http,
            token_cache,
            project_id: project_id.into(),
        })
    }

    /// Create from ambient credentials.
    pub async fn from_env(project_id: impl Into<String>) -> QueueResult<Self> {
        let auth = vidpipe_gcp::default_provider()
            .await
            .map_err(|e| QueueError::auth_error(e.to_string()))?;
        Self::new(project_id, Arc::new(TokenCache::new(auth, CLOUD_PLATFORM_SCOPE)))
    }

    async fn token(&self) -> QueueResult<String> {
        self.token_cache
            .get_token()
            .await
            .map_err(|e| QueueError::auth_error(e.to_string()))
    }

    fn topic_url(&self, topic: &str) -> String {
        format!("{}/projects/{}/topics/{}", API_BASE, self.project_id, topic)
    }

    /// Publish a JSON payload to a topic. Returns the message id.
    pub async fn publish<T: Serialize>(&self, topic: &str, payload: &T) -> QueueResult<String> {
        if topic.is_empty() {
            return Err(QueueError::NotConfigured);
        }

        let data = base64::engine::general_purpose::STANDARD
            .encode(serde_json::to_vec(payload)?);
        let request = PublishRequest {
            messages: vec![PublishMessage { data }],
        };
        let url = format!("{}:publish", self.topic_url(topic));

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
            return Err(QueueError::publish_failed(format!(
                "topic {} returned {}: {}",
                topic, status, body
            )));
        }

        let published: PublishResponse = response.json().await?;
        let message_id = published
            .message_ids
            .into_iter()
            .next()
            .unwrap_or_default();

        info!(topic, message_id, "Published message");
        Ok(message_id)
    }

    /// Check that a topic exists and is reachable with the current
    /// credentials.
    pub async fn topic_exists(&self, topic: &str) -> QueueResult<()> {
        if topic.is_empty() {
            return Err(QueueError::NotConfigured);
        }

        let url = self.topic_url(topic);
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
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(QueueError::publish_failed(format!(
                "topic {} returned {}: {}",
                topic, status, body
            )))
        }
    }
}
