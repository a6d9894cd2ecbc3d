//! HTTP routes for the rooms service.
//!
//! Defines the Axum router and application state.

use crate::auth::{JwksClient, JwtValidator};
use crate::config::Config;
use crate::handlers::{self, rooms};
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::RoomSettingsGetter;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    /// Meeting option lookup for rooms.
    pub settings_getter: Arc<dyn RoomSettingsGetter>,
}

/// Build the application routes.
///
/// Public:
/// - `/health` - database ping
/// - `/metrics` - Prometheus scrape endpoint
/// - `/api/v1/rooms/{friendly_id}/public`
/// - `/api/v1/users/{user_id}/avatar`
///
/// Everything else under `/api/v1/rooms` requires a bearer token.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let jwks_client = Arc::new(JwksClient::new(state.config.jwks_url.clone()));
    let jwt_validator = Arc::new(JwtValidator::new(
        jwks_client,
        Duration::from_secs(state.config.jwt_clock_skew_seconds),
    ));
    let auth_state = Arc::new(AuthState {
        jwt_validator,
        pool: state.pool.clone(),
    });

    let body_limit = state.config.max_request_body_bytes();

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/rooms/:friendly_id/public", get(rooms::public_show))
        .route("/api/v1/users/:user_id/avatar", get(handlers::show_avatar))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/v1/rooms", get(rooms::index).post(rooms::create))
        .route(
            "/api/v1/rooms/:friendly_id",
            get(rooms::show).patch(rooms::update).delete(rooms::destroy),
        )
        .route(
            "/api/v1/rooms/:friendly_id/purge_presentation",
            delete(rooms::purge_presentation),
        )
        .route(
            "/api/v1/rooms/:friendly_id/recordings",
            get(rooms::recordings),
        )
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. DefaultBodyLimit - base64 presentations are larger than the raw limit
    // 2. TimeoutLayer
    // 3. TraceLayer
    // 4. http_metrics_middleware - outermost, sees every response
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_config_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Config>();
    }
}
