//! Firestore-backed metadata ledger for the vidpipe pipeline.
//!
//! Talks to the Firestore REST API directly:
//! - Merge-semantics document writes (PATCH with an update mask)
//! - Token caching with 401 retry
//! - Typed repositories for video and transcript records

pub mod client;
pub mod error;
pub mod metrics;
pub mod repos;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use repos::{TranscriptRepository, VideoRepository};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
