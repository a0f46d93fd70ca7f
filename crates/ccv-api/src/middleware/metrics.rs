//! # Metrics
//!
//! Request metrics are recorded in middleware; domain counters are recorded
//! where the events happen. Everything goes through the `metrics` facade
//! and is rendered by the Prometheus recorder installed at startup. With no
//! recorder installed the macros are no-ops.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const HTTP_REQUESTS_TOTAL: &str = "ccv_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "ccv_http_request_duration_seconds";
pub const ROUNDS_COMPLETED_TOTAL: &str = "ccv_rounds_completed_total";
pub const PAYMENTS_RECORDED_TOTAL: &str = "ccv_payments_recorded_total";
pub const LEDGER_SUBMISSIONS_TOTAL: &str = "ccv_ledger_submissions_total";
pub const OVERDUE_ROUNDS: &str = "ccv_overdue_rounds";

/// Install the global Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Count requests and time them, labelled by route template.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());
    response
}
