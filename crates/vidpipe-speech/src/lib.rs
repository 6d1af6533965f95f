//! Long-running speech recognition for the vidpipe pipeline.
//!
//! Drives the Speech-to-Text v1 REST API:
//! - Submit a `longrunningrecognize` request for a `gs://` audio file
//! - Poll the returned operation on a bounded schedule
//! - Decode word time offsets into timed transcript segments

pub mod client;
pub mod decode;
pub mod error;
pub mod types;

pub use client::{SpeechClient, MAX_POLL_ATTEMPTS, POLL_INTERVAL};
pub use decode::{build_payload, decode_response};
pub use error::{SpeechError, SpeechResult};
pub use types::{parse_duration, recognition_model, LongRunningRecognizeResponse, Operation};
