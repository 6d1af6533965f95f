//! Filename and object-key derivation.
//!
//! Every derived name in the pipeline comes from the raw upload filename,
//! so all services agree on keys without coordination.

/// Transcript document id used when a video has a single transcript.
pub const DEFAULT_TRANSCRIPT_ID: &str = "primary";

/// Derive the video id from the uploaded filename: everything before the
/// first `.`. A filename without an extension maps to itself.
pub fn video_id_from_filename(filename: &str) -> &str {
    match filename.find('.') {
        Some(idx) => &filename[..idx],
        None => filename,
    }
}

/// Derive the owning user id from a video id: everything before the first
/// `-`. Upload names are `<uid>-<timestamp>.<ext>` by convention; an id
/// without a dash maps to itself.
pub fn uid_from_video_id(video_id: &str) -> &str {
    match video_id.find('-') {
        Some(idx) => &video_id[..idx],
        None => video_id,
    }
}

/// Object key for the transcoded output in the processed bucket.
pub fn processed_video_name(raw_filename: &str) -> String {
    format!("processed-{raw_filename}")
}

/// Object key for the extracted audio work file.
pub fn audio_work_name(video_id: &str) -> String {
    format!("{video_id}.flac")
}

/// Object key for the transcript artifact in the transcripts bucket.
pub fn transcript_object_path(video_id: &str) -> String {
    format!("{video_id}/transcript.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_stops_at_first_dot() {
        assert_eq!(video_id_from_filename("abc123-1700000000.mp4"), "abc123-1700000000");
        assert_eq!(video_id_from_filename("clip.tar.gz"), "clip");
        assert_eq!(video_id_from_filename("noext"), "noext");
    }

    #[test]
    fn test_uid_stops_at_first_dash() {
        assert_eq!(uid_from_video_id("abc123-1700000000"), "abc123");
        assert_eq!(uid_from_video_id("user-a-b"), "user");
        assert_eq!(uid_from_video_id("nodash"), "nodash");
    }

    #[test]
    fn test_derived_object_keys() {
        assert_eq!(processed_video_name("abc-1.mp4"), "processed-abc-1.mp4");
        assert_eq!(audio_work_name("abc-1"), "abc-1.flac");
        assert_eq!(transcript_object_path("abc-1"), "abc-1/transcript.json");
    }
}
