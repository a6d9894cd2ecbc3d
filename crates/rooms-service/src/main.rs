//! Rooms Service
//!
//! Entry point for the rooms HTTP API.

use anyhow::Context;
use rooms_service::config::Config;
use rooms_service::observability::metrics::init_metrics_recorder;
use rooms_service::routes::{self, AppState};
use rooms_service::services::DbRoomSettingsGetter;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Per-statement limit applied through the connection string.
const STATEMENT_TIMEOUT_SECS: u32 = 5;

const MAX_DB_CONNECTIONS: u32 = 20;
const MIN_DB_CONNECTIONS: u32 = 2;

/// Drain period when `ROOMS_DRAIN_SECONDS` is unset or unparsable.
const DEFAULT_DRAIN_SECS: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rooms_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "Rooms Service exited with an error");
        return Err(e);
    }

    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    info!(
        bind_address = %config.bind_address,
        provider = %config.provider,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        max_presentation_bytes = config.max_presentation_bytes,
        "Rooms Service starting"
    );

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("parsing bind address {:?}", config.bind_address))?;

    let metrics_handle = init_metrics_recorder()
        .map_err(anyhow::Error::msg)
        .context("installing metrics recorder")?;

    let pool = connect_pool(&config).await?;

    let state = Arc::new(AppState {
        settings_getter: Arc::new(DbRoomSettingsGetter::new(pool.clone())),
        pool,
        config,
    });
    let app = routes::build_routes(state, metrics_handle);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Accepting connections");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain_period()))
    .await
    .context("serving HTTP")?;

    info!("Rooms Service stopped");
    Ok(())
}

async fn connect_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_DB_CONNECTIONS)
        .min_connections(MIN_DB_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&add_query_timeout(&config.database_url, STATEMENT_TIMEOUT_SECS))
        .await
        .context("connecting to database")?;

    info!(max_connections = MAX_DB_CONNECTIONS, "Database pool ready");
    Ok(pool)
}

fn drain_period() -> Duration {
    let secs = std::env::var("ROOMS_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_DRAIN_SECS);
    Duration::from_secs(secs)
}

/// Resolves on SIGINT or SIGTERM, after the drain period has elapsed.
async fn shutdown_signal(drain: Duration) {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("SIGINT received"),
        _ = terminate => info!("SIGTERM received"),
    }

    if drain.is_zero() {
        return;
    }

    warn!(drain_secs = drain.as_secs(), "Draining in-flight requests");
    tokio::time::sleep(drain).await;
}

/// Append a `statement_timeout` option to a Postgres connection URL.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}options=-c%20statement_timeout%3D{timeout_secs}s")
}
