//! Pub/Sub plumbing for the vidpipe pipeline.
//!
//! Two halves:
//! - Decoding push-delivery envelopes (base64 JSON inside `message.data`)
//! - Publishing transcription jobs to a topic via the REST API

pub mod envelope;
pub mod error;
pub mod publisher;

pub use envelope::{
    decode_job, decode_upload_notification, PushEnvelope, PushMessage, TranscriptionJobPayload,
    UploadNotification,
};
pub use error::{QueueError, QueueResult};
pub use publisher::PubSubPublisher;
