//! Prometheus metrics for the ingress server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vidpipe_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vidpipe_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vidpipe_http_requests_in_flight";

    // Pipeline metrics
    pub const VIDEOS_PROCESSED_TOTAL: &str = "vidpipe_videos_processed_total";
    pub const VIDEOS_FAILED_TOTAL: &str = "vidpipe_videos_failed_total";
    pub const PROCESSING_ATTEMPTS_TOTAL: &str = "vidpipe_processing_attempts_total";
    pub const TRANSCRIPTIONS_COMPLETED_TOTAL: &str = "vidpipe_transcriptions_completed_total";
    pub const TRANSCRIPTIONS_FAILED_TOTAL: &str = "vidpipe_transcriptions_failed_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a video reaching a terminal state.
pub fn record_video_outcome(succeeded: bool) {
    if succeeded {
        counter!(names::VIDEOS_PROCESSED_TOTAL).increment(1);
    } else {
        counter!(names::VIDEOS_FAILED_TOTAL).increment(1);
    }
}

/// Record one top-level processing attempt.
pub fn record_processing_attempt() {
    counter!(names::PROCESSING_ATTEMPTS_TOTAL).increment(1);
}

/// Record a transcription job reaching a terminal state.
pub fn record_transcription_outcome(succeeded: bool) {
    if succeeded {
        counter!(names::TRANSCRIPTIONS_COMPLETED_TOTAL).increment(1);
    } else {
        counter!(names::TRANSCRIPTIONS_FAILED_TOTAL).increment(1);
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
