//! Speech-to-Text v1 REST API types.

use serde::{Deserialize, Serialize};

/// Map the configured model name to the recognizer's model identifier.
///
/// "short" selects the short-utterance model; anything else gets the
/// long-form model.
pub fn recognition_model(model: &str) -> &'static str {
    if model == "short" {
        "latest_short"
    } else {
        "latest_long"
    }
}

/// Parse a protobuf JSON duration like `"3.500s"` into seconds.
pub fn parse_duration(value: &str) -> Option<f64> {
    value.strip_suffix('s')?.parse().ok()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LongRunningRecognizeRequest {
    pub config: RecognitionConfig,
    pub audio: RecognitionAudio,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionConfig {
    pub encoding: String,
    pub language_code: String,
    pub model: String,
    pub enable_automatic_punctuation: bool,
    pub enable_word_time_offsets: bool,
    pub profanity_filter: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecognitionAudio {
    pub uri: String,
}

/// A long-running operation as returned by the operations endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: Option<String>,
    #[serde(default)]
    pub done: bool,
    pub error: Option<OperationStatus>,
    pub response: Option<LongRunningRecognizeResponse>,
    pub metadata: Option<OperationMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    pub code: Option<i32>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    pub progress_percent: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongRunningRecognizeResponse {
    pub results: Option<Vec<SpeechRecognitionResult>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRecognitionResult {
    pub alternatives: Option<Vec<SpeechRecognitionAlternative>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRecognitionAlternative {
    pub transcript: Option<String>,
    pub confidence: Option<f32>,
    pub words: Option<Vec<WordInfo>>,
}

/// One recognized word with its time offsets (protobuf JSON durations).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordInfo {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub word: Option<String>,
}
