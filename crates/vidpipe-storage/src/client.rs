//! GCS JSON API client.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use vidpipe_gcp::{TokenCache, CLOUD_PLATFORM_SCOPE};

use crate::error::{StorageError, StorageResult};

const API_BASE: &str = "https://storage.googleapis.com/storage/v1";
const UPLOAD_BASE: &str = "https://storage.googleapis.com/upload/storage/v1";

/// Build a `gs://` URI for an object.
pub fn gs_uri(bucket: &str, object: &str) -> String {
    format!("gs://{bucket}/{object}")
}

/// Build the public HTTPS URL for an object in a public-read bucket.
pub fn public_url(bucket: &str, object: &str) -> String {
    format!("https://storage.googleapis.com/{bucket}/{object}")
}

/// Cloud Storage client.
///
/// Bucket-agnostic: every call names its bucket, so one client serves the
/// raw, processed, audio, and transcript buckets.
#[derive(Clone)]
pub struct GcsClient {
    http: Client,
    token_cache: Arc<TokenCache>,
}

impl GcsClient {
    /// Create a new client with a shared token cache.
    pub fn new(token_cache: Arc<TokenCache>) -> StorageResult<Self> {
        let http = Client::builder()
            // Large media transfers; the connect timeout is the one that matters
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("vidpipe-storage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StorageError::Network)?;

        Ok(Self { http, token_cache })
    }

    /// Create from ambient credentials.
    pub async fn from_env() -> StorageResult<Self> {
        let auth = vidpipe_gcp::default_provider()
            .await
            .map_err(|e| StorageError::auth_error(e.to_string()))?;
        Self::new(Arc::new(TokenCache::new(auth, CLOUD_PLATFORM_SCOPE)))
    }

    async fn token(&self) -> StorageResult<String> {
        self.token_cache
            .get_token()
            .await
            .map_err(|e| StorageError::auth_error(e.to_string()))
    }

    fn object_url(bucket: &str, object: &str) -> String {
        format!("{}/b/{}/o/{}", API_BASE, bucket, urlencoding::encode(object))
    }

    /// Download an object to a local file, streaming chunk by chunk.
    pub async fn download_to_file(
        &self,
        bucket: &str,
        object: &str,
        path: impl AsRef<Path>,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Downloading gs://{}/{} to {}", bucket, object, path.display());

        let url = format!("{}?alt=media", Self::object_url(bucket, object));
        let response = self.get_with_auth_retry(&url).await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(StorageError::not_found(gs_uri(bucket, object)));
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(StorageError::download_failed(format!(
                    "{} returned {}: {}",
                    url, status, body
                )));
            }
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StorageError::download_failed(e.to_string()))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        info!("Downloaded gs://{}/{} to {}", bucket, object, path.display());
        Ok(())
    }

    /// Upload a local file as an object, streaming from disk.
    ///
    /// With `public` set, the object is created with a public-read ACL so
    /// it can be served directly from the bucket.
    pub async fn upload_file(
        &self,
        bucket: &str,
        object: &str,
        path: impl AsRef<Path>,
        content_type: &str,
        public: bool,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to gs://{}/{}", path.display(), bucket, object);

        let mut url = format!(
            "{}/b/{}/o?uploadType=media&name={}",
            UPLOAD_BASE,
            bucket,
            urlencoding::encode(object)
        );
        if public {
            url.push_str("&predefinedAcl=publicRead");
        }

        // Re-open the file on the auth retry; a Body built from a stream
        // cannot be replayed.
        let send = |token: String| async {
            let file = tokio::fs::File::open(path).await?;
            let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
            let response = self
                .http
                .post(&url)
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body)
                .send()
                .await?;
            Ok::<_, StorageError>(response)
        };

        let mut response = send(self.token().await?).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.token_cache.invalidate().await;
            response = send(self.token().await?).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::upload_failed(format!(
                "gs://{}/{} returned {}: {}",
                bucket, object, status, body
            )));
        }

        info!("Uploaded {} to gs://{}/{}", path.display(), bucket, object);
        Ok(())
    }

    /// Upload in-memory bytes as an object.
    pub async fn upload_bytes(
        &self,
        bucket: &str,
        object: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to gs://{}/{}", data.len(), bucket, object);

        let url = format!(
            "{}/b/{}/o?uploadType=media&name={}",
            UPLOAD_BASE,
            bucket,
            urlencoding::encode(object)
        );

        let send = |token: String, data: Vec<u8>| async {
            self.http
                .post(&url)
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(data)
                .send()
                .await
                .map_err(StorageError::Network)
        };

        let mut response = send(self.token().await?, data.clone()).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.token_cache.invalidate().await;
            response = send(self.token().await?, data).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::upload_failed(format!(
                "gs://{}/{} returned {}: {}",
                bucket, object, status, body
            )));
        }

        Ok(())
    }

    /// Delete an object. Deleting a missing object succeeds.
    pub async fn delete_object(&self, bucket: &str, object: &str) -> StorageResult<()> {
        debug!("Deleting gs://{}/{}", bucket, object);

        let url = Self::object_url(bucket, object);

        let mut response = self
            .http
            .delete(&url)
            .bearer_auth(self.token().await?)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.token_cache.invalidate().await;
            response = self
                .http
                .delete(&url)
                .bearer_auth(self.token().await?)
                .send()
                .await?;
        }

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!("gs://{}/{} already deleted (idempotent)", bucket, object);
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StorageError::delete_failed(format!(
                    "gs://{}/{} returned {}: {}",
                    bucket, object, status, body
                )))
            }
        }
    }

    /// Check if an object exists via its metadata.
    pub async fn exists(&self, bucket: &str, object: &str) -> StorageResult<bool> {
        let url = Self::object_url(bucket, object);
        let response = self.get_with_auth_retry(&url).await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StorageError::download_failed(format!(
                    "{} returned {}: {}",
                    url, status, body
                )))
            }
        }
    }

    /// Check that a bucket is reachable with the current credentials.
    pub async fn bucket_exists(&self, bucket: &str) -> StorageResult<()> {
        let url = format!("{}/b/{}", API_BASE, bucket);
        let response = self.get_with_auth_retry(&url).await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StorageError::download_failed(format!(
                "bucket {} returned {}: {}",
                bucket, status, body
            )))
        }
    }

    /// GET with a single retry on 401 after invalidating the token.
    async fn get_with_auth_retry(&self, url: &str) -> StorageResult<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .bearer_auth(self.token().await?)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.token_cache.invalidate().await;
            let retried = self
                .http
                .get(url)
                .bearer_auth(self.token().await?)
                .send()
                .await?;
            return Ok(retried);
        }

        Ok(response)
    }
}
