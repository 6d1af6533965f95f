//! Turn recognition results into transcript segments.

use chrono::Utc;

use vidpipe_models::{TranscriptPayload, TranscriptSegment};

use crate::types::{parse_duration, LongRunningRecognizeResponse};

/// Decode a recognition response into timed segments and the overall
/// audio duration.
///
/// Each result's top alternative becomes one segment. Segment times come
/// from the first and last word offsets; a segment with no words starts at
/// zero and ends where it starts. The duration is the furthest end time
/// seen.
pub fn decode_response(response: &LongRunningRecognizeResponse) -> (Vec<TranscriptSegment>, f64) {
    let mut segments = Vec::new();
    let mut max_end: f64 = 0.0;

    for result in response.results.iter().flatten() {
        let Some(alternative) = result.alternatives.as_ref().and_then(|a| a.first()) else {
            continue;
        };

        let words = alternative.words.as_deref().unwrap_or(&[]);
        let start_time = words
            .first()
            .and_then(|w| w.start_time.as_deref())
            .and_then(parse_duration)
            .unwrap_or(0.0);
        let end_time = words
            .last()
            .and_then(|w| w.end_time.as_deref())
            .and_then(parse_duration)
            .unwrap_or(start_time);
        max_end = max_end.max(end_time);

        segments.push(TranscriptSegment {
            text: alternative.transcript.as_deref().unwrap_or("").trim().to_string(),
            start_time,
            end_time,
            confidence: alternative.confidence,
        });
    }

    (segments, max_end)
}

/// Assemble the durable transcript artifact.
pub fn build_payload(
    video_id: &str,
    language: &str,
    model: &str,
    segments: Vec<TranscriptSegment>,
    duration_seconds: f64,
) -> TranscriptPayload {
    TranscriptPayload {
        video_id: video_id.to_string(),
        language: language.to_string(),
        model: model.to_string(),
        duration_seconds,
        segments,
        created_at: Utc::now(),
    }
}
