//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Handler for GET /health
///
/// Pings the database. Returns 200 when it answers and 503 otherwise; the
/// underlying error is only logged.
#[tracing::instrument(skip_all, name = "rooms.health")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let provider = state.config.provider.clone();

    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                provider,
                database: "healthy",
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "rooms.health", error = %e, "Health check failed: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    provider,
                    database: "unhealthy",
                }),
            )
        }
    }
}
