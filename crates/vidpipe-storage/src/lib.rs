//! Cloud Storage client for the vidpipe buckets.
//!
//! Talks to the GCS JSON API directly over HTTPS:
//! - Streaming downloads (`alt=media`) straight to disk
//! - Streaming media uploads with optional public-read ACL
//! - Idempotent deletes (a missing object is not an error)
//! - Bucket reachability probe for health checks

pub mod client;
pub mod error;

pub use client::{gs_uri, public_url, GcsClient};
pub use error::{StorageError, StorageResult};
