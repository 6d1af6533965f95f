//! Aggregated health check.
//!
//! Probes the three dependencies the pipeline cannot run without, in
//! parallel. Zero failing probes reads `ok`, all failing reads
//! `unhealthy`, anything in between is `degraded`.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub environment: String,
    pub dependencies: Dependencies,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependencies {
    pub firestore: DependencyCheck,
    pub raw_video_bucket: DependencyCheck,
    pub processed_video_bucket: DependencyCheck,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub latency_ms: u64,
}

impl DependencyCheck {
    fn from_result(result: ApiResult<()>, latency_ms: u64) -> Self {
        match result {
            Ok(()) => Self {
                status: "pass".to_string(),
                details: None,
                latency_ms,
            },
            Err(e) => Self {
                status: "fail".to_string(),
                details: Some(e.to_string()),
                latency_ms,
            },
        }
    }

    fn failed(&self) -> bool {
        self.status == "fail"
    }
}

/// Run one probe with its own clock, so each check reports the latency of
/// that dependency rather than the slowest of the batch.
async fn timed(probe: impl std::future::Future<Output = ApiResult<()>>) -> DependencyCheck {
    let started = Instant::now();
    let result = probe.await;
    DependencyCheck::from_result(result, started.elapsed().as_millis() as u64)
}

/// Overall status from the number of failing probes.
fn overall_status(failing: usize, total: usize) -> &'static str {
    if failing == 0 {
        "ok"
    } else if failing == total {
        "unhealthy"
    } else {
        "degraded"
    }
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (firestore, raw_video_bucket, processed_video_bucket) = tokio::join!(
        timed(state.ledger.probe()),
        timed(state.storage.probe_raw_bucket()),
        timed(state.storage.probe_processed_bucket()),
    );

    let dependencies = Dependencies {
        firestore,
        raw_video_bucket,
        processed_video_bucket,
    };

    let failing = [
        &dependencies.firestore,
        &dependencies.raw_video_bucket,
        &dependencies.processed_video_bucket,
    ]
    .iter()
    .filter(|c| c.failed())
    .count();
    let status = overall_status(failing, 3);

    let response = HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        version: state.config.version.clone(),
        environment: state.config.environment.clone(),
        dependencies,
    };

    let code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status_aggregation() {
        assert_eq!(overall_status(0, 3), "ok");
        assert_eq!(overall_status(1, 3), "degraded");
        assert_eq!(overall_status(2, 3), "degraded");
        assert_eq!(overall_status(3, 3), "unhealthy");
    }

    #[tokio::test]
    async fn test_each_check_times_its_own_probe() {
        use std::time::Duration;

        let slow = timed(async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok(())
        });
        let fast = timed(async { Ok(()) });
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(slow.latency_ms >= 40);
        assert!(fast.latency_ms < slow.latency_ms);
    }

    mod handler {
        use super::super::*;
        use crate::testing::{test_state as state, FakeLedger, FakeStore};
        use std::sync::Arc;

        #[tokio::test]
        async fn test_all_probes_passing_is_ok() {
            let store = Arc::new(FakeStore::default());
            let ledger = Arc::new(FakeLedger::default());
            let (code, Json(body)) = health(State(state(store, ledger))).await;

            assert_eq!(code, StatusCode::OK);
            assert_eq!(body.status, "ok");
            assert_eq!(body.version, "1.2.3");
            assert_eq!(body.dependencies.firestore.status, "pass");
        }

        #[tokio::test]
        async fn test_one_failing_probe_is_degraded() {
            let store = Arc::new(FakeStore::default());
            store.fail_raw_probe();
            let ledger = Arc::new(FakeLedger::default());
            let (code, Json(body)) = health(State(state(store, ledger))).await;

            assert_eq!(code, StatusCode::OK);
            assert_eq!(body.status, "degraded");
            assert_eq!(body.dependencies.raw_video_bucket.status, "fail");
            assert!(body.dependencies.raw_video_bucket.details.is_some());
        }

        #[tokio::test]
        async fn test_all_probes_failing_is_unhealthy() {
            let store = Arc::new(FakeStore::default());
            store.fail_raw_probe();
            store.fail_processed_probe();
            let ledger = Arc::new(FakeLedger::default());
            ledger.fail_probe();
            let (code, Json(body)) = health(State(state(store, ledger))).await;

            assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body.status, "unhealthy");
        }
    }
}
