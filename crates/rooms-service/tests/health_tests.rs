//! Health and metrics endpoint integration tests.

use rooms_test_utils::TestRoomsServer;
use sqlx::PgPool;

/// Test that health endpoint returns 200 and healthy status.
#[sqlx::test(migrations = "../../migrations")]
async fn test_health_endpoint_returns_200(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestRoomsServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.contains("application/json"));

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["provider"], "default");
    assert_eq!(body["database"], "healthy");

    Ok(())
}

/// Test that health reports the database as unhealthy once the pool is closed.
#[sqlx::test(migrations = "../../migrations")]
async fn test_health_endpoint_reports_database_down(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestRoomsServer::spawn(pool).await?;
    server.pool().close().await;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 503);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database"], "unhealthy");

    Ok(())
}

/// Test that the metrics endpoint is public and serves text.
#[sqlx::test(migrations = "../../migrations")]
async fn test_metrics_endpoint_is_public(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestRoomsServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

/// Unknown routes are a plain 404.
#[sqlx::test(migrations = "../../migrations")]
async fn test_unknown_route_is_404(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestRoomsServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/api/v1/nothing-here", server.url())).await?;

    assert_eq!(response.status(), 404);

    Ok(())
}
