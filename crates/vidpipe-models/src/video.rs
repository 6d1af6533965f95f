//! Video job record and status state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing a status string fails.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status: {0}")]
pub struct ParseStatusError(pub String);

/// Processing status of a video job.
///
/// Transitions are monotonic for a single video id:
/// absent -> `Processing` -> (`Processed` | `Failed`).
/// A message redelivered for an id that already carries a status must not
/// restart work; the ingress layer checks this before invoking the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    /// Pipeline has claimed the job and is working on it
    Processing,
    /// Transcoded output uploaded, terminal
    Processed,
    /// Attempts exhausted, terminal
    Failed,
}

impl VideoStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Processed => "processed",
            VideoStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Processed | VideoStatus::Failed)
    }

    /// Validate a status transition.
    ///
    /// Identity writes are allowed (merge-semantics redeliveries are
    /// idempotent); moving backwards or out of a terminal state is not.
    pub fn can_follow(current: Option<VideoStatus>, next: VideoStatus) -> bool {
        match current {
            None => matches!(next, VideoStatus::Processing),
            Some(VideoStatus::Processing) => true,
            Some(VideoStatus::Processed) => matches!(next, VideoStatus::Processed),
            Some(VideoStatus::Failed) => matches!(next, VideoStatus::Failed),
        }
    }
}

impl std::str::FromStr for VideoStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(VideoStatus::Processing),
            "processed" => Ok(VideoStatus::Processed),
            "failed" => Ok(VideoStatus::Failed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Partial video record as persisted in the metadata store.
///
/// Every field is optional: writes use merge semantics, so a mutation only
/// carries the fields it intends to change and leaves the rest untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Video {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Video {
    /// Mutation that only moves the status field.
    pub fn with_status(status: VideoStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// A record is new when it has never been claimed (no status yet).
    pub fn is_new(&self) -> bool {
        self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            VideoStatus::Processing,
            VideoStatus::Processed,
            VideoStatus::Failed,
        ] {
            assert_eq!(VideoStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(VideoStatus::from_str("done").is_err());
    }

    #[test]
    fn test_transitions_are_monotonic() {
        use VideoStatus::*;

        assert!(VideoStatus::can_follow(None, Processing));
        assert!(!VideoStatus::can_follow(None, Processed));
        assert!(!VideoStatus::can_follow(None, Failed));

        assert!(VideoStatus::can_follow(Some(Processing), Processed));
        assert!(VideoStatus::can_follow(Some(Processing), Failed));
        assert!(VideoStatus::can_follow(Some(Processing), Processing));

        // Terminal states only accept identity writes
        assert!(!VideoStatus::can_follow(Some(Processed), Processing));
        assert!(!VideoStatus::can_follow(Some(Processed), Failed));
        assert!(VideoStatus::can_follow(Some(Processed), Processed));
        assert!(!VideoStatus::can_follow(Some(Failed), Processing));
        assert!(VideoStatus::can_follow(Some(Failed), Failed));
    }

    #[test]
    fn test_is_new() {
        assert!(Video::default().is_new());
        assert!(!Video::with_status(VideoStatus::Processing).is_new());
    }
}
