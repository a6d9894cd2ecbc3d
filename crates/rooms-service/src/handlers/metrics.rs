//! Prometheus metrics endpoint.
//!
//! Unauthenticated so Prometheus can scrape it. Labels carry route
//! templates and outcomes only, never ids or names.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// ```text
/// # TYPE rooms_http_requests_total counter
/// rooms_http_requests_total{method="GET",endpoint="/api/v1/rooms",status_code="200"} 42
/// ```
#[tracing::instrument(skip_all, name = "rooms.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[tokio::test]
    async fn test_metrics_handler_renders_text() {
        // A recorder that is built but not installed gives a private handle.
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let response = metrics_handler(State(handle)).await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
