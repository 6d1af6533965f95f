//! HTTP ingress and orchestration for the vidpipe pipeline.
//!
//! Three handlers share one process:
//! - `POST /process-video` — upload notification ingress, runs the
//!   transcode pipeline, always acknowledges
//! - `POST /transcribe-audio` — transcription job ingress
//! - `GET /health` — aggregated dependency probes
//!
//! Every external system sits behind a trait in [`gateway`], so the
//! orchestrator and handlers run against fakes in tests.

pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod processor;
pub mod routes;
pub mod state;
pub mod transcription;

#[cfg(test)]
pub mod testing;

pub use config::ServiceConfig;
pub use error::{ApiError, ApiResult};
pub use processor::VideoProcessor;
pub use routes::create_router;
pub use state::AppState;
pub use transcription::TranscriptionRunner;
