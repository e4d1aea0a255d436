//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "tubefetch_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "tubefetch_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "tubefetch_http_requests_in_flight";

    // WebSocket metrics
    pub const WS_CONNECTIONS_TOTAL: &str = "tubefetch_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "tubefetch_ws_connections_active";
    pub const WS_MESSAGES_SENT: &str = "tubefetch_ws_messages_sent_total";

    // Session metrics
    pub const SESSIONS_ACTIVE: &str = "tubefetch_sessions_active";
    pub const ANALYSES_TOTAL: &str = "tubefetch_analyses_total";
    pub const INSIGHTS_TOTAL: &str = "tubefetch_insights_total";
    pub const DOWNLOADS_STARTED_TOTAL: &str = "tubefetch_downloads_started_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "tubefetch_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record WebSocket connection.
pub fn record_ws_connection(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::WS_CONNECTIONS_TOTAL, &labels).increment(1);
}

/// Update active WebSocket connections gauge.
pub fn set_ws_active_connections(count: i64) {
    gauge!(names::WS_CONNECTIONS_ACTIVE).set(count as f64);
}

/// Record WebSocket message sent.
pub fn record_ws_message_sent(endpoint: &str, message_type: &str) {
    let labels = [
        ("endpoint", endpoint.to_string()),
        ("type", message_type.to_string()),
    ];
    counter!(names::WS_MESSAGES_SENT, &labels).increment(1);
}

/// Update active sessions gauge.
pub fn set_active_sessions(count: usize) {
    gauge!(names::SESSIONS_ACTIVE).set(count as f64);
}

/// Record a finished analysis.
pub fn record_analysis(found: bool) {
    let labels = [("result", if found { "found" } else { "not_found" }.to_string())];
    counter!(names::ANALYSES_TOTAL, &labels).increment(1);
}

/// Record an insight request by source (`live` or `fallback`).
pub fn record_insight_outcome(source: &str) {
    let labels = [("source", source.to_string())];
    counter!(names::INSIGHTS_TOTAL, &labels).increment(1);
}

/// Record a simulated download start.
pub fn record_download_started(format: &str) {
    let labels = [("format", format.to_string())];
    counter!(names::DOWNLOADS_STARTED_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid uuid pattern")
});

/// Sanitize path for metrics labels (remove session IDs).
fn sanitize_path(path: &str) -> String {
    UUID_SEGMENT.replace_all(path, ":id").to_string()
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
