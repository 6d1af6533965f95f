//! HTTP handlers.

pub mod health;
pub mod process_video;
pub mod transcribe;

pub use health::health;
pub use process_video::process_video;
pub use transcribe::transcribe_audio;
