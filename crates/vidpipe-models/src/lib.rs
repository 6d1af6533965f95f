//! Shared data models for the vidpipe pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video job records and their status state machine
//! - Transcript records, segments, and the durable transcript payload
//! - Filename and object-key derivation helpers

pub mod naming;
pub mod transcript;
pub mod video;

// Re-export common types
pub use naming::{
    audio_work_name, processed_video_name, transcript_object_path, uid_from_video_id,
    video_id_from_filename, DEFAULT_TRANSCRIPT_ID,
};
pub use transcript::{
    Transcript, TranscriptPayload, TranscriptSegment, TranscriptStatus, TranscriptUpdate,
};
pub use video::{ParseStatusError, Video, VideoStatus};
