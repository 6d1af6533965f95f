//! FFmpeg progress reporting.

/// Snapshot of FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProgress {
    /// Output time processed so far, in milliseconds
    pub out_time_ms: i64,
    /// Output time as reported (`HH:MM:SS.micros`)
    pub out_time: String,
    /// Frames encoded
    pub frame: u64,
    /// Encoding speed relative to realtime (e.g. 1.5 = 1.5x)
    pub speed: f64,
    /// True once FFmpeg reports `progress=end`
    pub is_complete: bool,
}
