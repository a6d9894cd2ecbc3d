//! Metrics definitions for the rooms service.
//!
//! Naming follows Prometheus conventions: `rooms_` prefix, `_total` for
//! counters, `_seconds` for duration histograms.
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP verbs
//! - `endpoint`: route templates (friendly ids and user ids replaced)
//! - `status`: success, error, timeout
//! - `operation`: fixed set of room actions and query names
//! - `outcome`: success or an error type from `RoomsError::error_type`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return its handle.
///
/// # Errors
///
/// Returns an error if bucket configuration fails or a recorder is already
/// installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("rooms_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("rooms_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP
// ============================================================================

/// Record a completed HTTP request.
///
/// Metrics: `rooms_http_requests_total`, `rooms_http_request_duration_seconds`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("rooms_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("rooms_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path to its route template.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/api/v1/rooms" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').collect();

    // ["", "api", "v1", "rooms", "{friendly_id}", ...]
    if path.starts_with("/api/v1/rooms/") {
        match (parts.len(), parts.get(5).copied()) {
            (5, _) => return "/api/v1/rooms/{friendly_id}".to_string(),
            (6, Some(action @ ("public" | "recordings" | "purge_presentation"))) => {
                return format!("/api/v1/rooms/{{friendly_id}}/{action}");
            }
            _ => {}
        }
    }

    if path.starts_with("/api/v1/users/") && parts.len() == 6 {
        if let Some(&"avatar") = parts.get(5) {
            return "/api/v1/users/{user_id}/avatar".to_string();
        }
    }

    "/other".to_string()
}

// ============================================================================
// Room operations
// ============================================================================

/// Record the outcome of a room action.
///
/// Metric: `rooms_room_operations_total`
/// Labels: `operation` (index, show, public_show, create, update,
/// purge_presentation, destroy, recordings), `outcome`
pub fn record_room_operation(operation: &'static str, outcome: &'static str) {
    counter!("rooms_room_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

// ============================================================================
// Database
// ============================================================================

/// Record a database query.
///
/// Metrics: `rooms_db_query_duration_seconds`, `rooms_db_queries_total`
pub fn record_db_query(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("rooms_db_query_duration_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());

    counter!("rooms_db_queries_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // No recorder is installed here; the calls go to the global no-op
    // recorder and only exercise the label handling.

    #[test]
    fn test_record_functions_do_not_panic() {
        record_http_request("GET", "/api/v1/rooms", 200, Duration::from_millis(5));
        record_http_request(
            "DELETE",
            "/api/v1/rooms/abc-def-ghi-jkl",
            403,
            Duration::from_millis(7),
        );
        record_room_operation("destroy", "forbidden");
        record_db_query("delete_room", "success", Duration::from_millis(3));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(201), "success");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
        assert_eq!(categorize_status_code(400), "error");
        assert_eq!(categorize_status_code(403), "error");
        assert_eq!(categorize_status_code(413), "error");
        assert_eq!(categorize_status_code(500), "error");
    }

    #[test]
    fn test_normalize_static_paths() {
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/api/v1/rooms"), "/api/v1/rooms");
    }

    #[test]
    fn test_normalize_room_paths() {
        assert_eq!(
            normalize_endpoint("/api/v1/rooms/abc-def-ghi-jkl"),
            "/api/v1/rooms/{friendly_id}"
        );
        assert_eq!(
            normalize_endpoint("/api/v1/rooms/abc-def-ghi-jkl/public"),
            "/api/v1/rooms/{friendly_id}/public"
        );
        assert_eq!(
            normalize_endpoint("/api/v1/rooms/abc-def-ghi-jkl/recordings"),
            "/api/v1/rooms/{friendly_id}/recordings"
        );
        assert_eq!(
            normalize_endpoint("/api/v1/rooms/abc-def-ghi-jkl/purge_presentation"),
            "/api/v1/rooms/{friendly_id}/purge_presentation"
        );
    }

    #[test]
    fn test_normalize_avatar_path() {
        assert_eq!(
            normalize_endpoint("/api/v1/users/7a0f2c1e-0000-4000-8000-000000000000/avatar"),
            "/api/v1/users/{user_id}/avatar"
        );
    }

    #[test]
    fn test_normalize_unknown_paths_are_bounded() {
        assert_eq!(normalize_endpoint("/"), "/other");
        assert_eq!(normalize_endpoint("/api/v1/rooms/x/unknown"), "/other");
        assert_eq!(normalize_endpoint("/api/v1/rooms/x/recordings/1"), "/other");
        assert_eq!(normalize_endpoint("/api/v1/users/x"), "/other");
        assert_eq!(normalize_endpoint("/wp-admin"), "/other");
    }
}
