//! FFmpeg-based media processing for the vidpipe pipeline.
//!
//! Two operations, both shelling out to `ffmpeg`:
//! - Transcode a raw upload to 360p H.264
//! - Extract mono 16 kHz FLAC audio for speech recognition
//!
//! Plus local scratch-directory management for Cloud Run style instances.

pub mod command;
pub mod error;
pub mod ops;
pub mod progress;
pub mod workdir;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use ops::{audio_extract_command, extract_audio, transcode_command, transcode_to_360p};
pub use progress::FfmpegProgress;
pub use workdir::{remove_file_if_exists, WorkDirs};
