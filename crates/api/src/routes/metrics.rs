//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers help text for the lending counters and the read-view histogram.
///
/// Call once after the recorder is installed.
pub fn describe() {
    metrics::describe_counter!(
        "loan_requests_submitted",
        "Loan requests accepted by the availability gate"
    );
    metrics::describe_counter!(
        "loan_requests_rejected",
        "Loan requests refused by validation, the gate or a constraint"
    );
    metrics::describe_counter!(
        "loan_requests_cancelled",
        "Loan request rows removed by cancellation or bulk deletion"
    );
    metrics::describe_counter!("loans_created", "Loans opened directly or by promotion");
    metrics::describe_counter!("loans_closed", "Loan rows removed on return");
    metrics::describe_counter!("users_registered", "Accounts created through registration");
    metrics::describe_histogram!(
        "projection_query_duration_seconds",
        Unit::Seconds,
        "Time spent serving a read view, labelled by view"
    );
}

/// GET /metrics
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
