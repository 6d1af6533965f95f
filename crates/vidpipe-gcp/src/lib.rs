//! Shared Google Cloud authentication for vidpipe service clients.
//!
//! Every GCP-facing crate (storage, metadata store, speech, queue) talks to
//! a REST API with a bearer token. This crate provides:
//! - Provider discovery via `gcp_auth` (metadata server, ADC, or key file)
//! - A thread-safe token cache with single-flight refresh
//! - The OAuth scopes the pipeline needs

pub mod error;
pub mod token_cache;

pub use error::{AuthError, AuthResult};
pub use token_cache::{TokenCache, CLOUD_PLATFORM_SCOPE, DATASTORE_SCOPE};

use std::sync::Arc;

use gcp_auth::TokenProvider;

/// Discover a token provider from the ambient environment.
///
/// Resolution order follows `gcp_auth`: explicit service-account key file
/// (`GOOGLE_APPLICATION_CREDENTIALS`), gcloud user credentials, then the
/// GCE/Cloud Run metadata server.
pub async fn default_provider() -> AuthResult<Arc<dyn TokenProvider>> {
    gcp_auth::provider()
        .await
        .map_err(|e| AuthError::provider(e.to_string()))
}
