//! Integration tests for GET /api/v1/rooms/{friendly_id}/public.
//!
//! The endpoint is unauthenticated and reports access codes only as present
//! or absent. Tests run against both the database-backed settings getter and
//! the mock.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use rooms_service::services::room_settings::mock::MockRoomSettingsGetter;
use rooms_test_utils::*;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

const FRIENDLY_ID: &str = "abc-def-ghi-jkl";

async fn get_public(server: &TestRoomsServer, friendly_id: &str) -> Result<(u16, Value)> {
    let response = reqwest::get(format!(
        "{}/api/v1/rooms/{}/public",
        server.url(),
        friendly_id
    ))
    .await?;

    let status = response.status().as_u16();
    Ok((status, response.json().await?))
}

// ============================================================================
// Database-backed settings
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_public_show_reports_room_settings(pool: PgPool) -> Result<()> {
    let server = TestRoomsServer::spawn(pool).await?;
    let alice = create_test_user(server.pool(), "Alice").await?;
    let room = create_test_room(server.pool(), alice, "Town Hall", FRIENDLY_ID).await?;

    set_room_option(server.pool(), room, "glRequireAuthentication", "true").await?;
    set_room_option(server.pool(), room, "glViewerAccessCode", "123456").await?;
    set_room_option(server.pool(), room, "glModeratorAccessCode", "").await?;

    let (status, body) = get_public(&server, FRIENDLY_ID).await?;

    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Town Hall");
    assert_eq!(body["data"]["require_authentication"], true);
    assert_eq!(body["data"]["viewer_access_code"], true);
    assert_eq!(body["data"]["moderator_access_code"], false);

    // The code itself never leaves the server
    assert!(!body.to_string().contains("123456"));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_public_show_room_without_options(pool: PgPool) -> Result<()> {
    let server = TestRoomsServer::spawn(pool).await?;
    let alice = create_test_user(server.pool(), "Alice").await?;
    create_test_room(server.pool(), alice, "Bare Room", FRIENDLY_ID).await?;

    let (status, body) = get_public(&server, FRIENDLY_ID).await?;

    assert_eq!(status, 200);
    assert_eq!(body["data"]["require_authentication"], false);
    assert_eq!(body["data"]["viewer_access_code"], false);
    assert_eq!(body["data"]["moderator_access_code"], false);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_public_show_applies_provider_overrides(pool: PgPool) -> Result<()> {
    let server = TestRoomsServer::spawn(pool).await?;
    let alice = create_test_user(server.pool(), "Alice").await?;
    let room = create_test_room(server.pool(), alice, "Town Hall", FRIENDLY_ID).await?;

    set_room_option(server.pool(), room, "glRequireAuthentication", "false").await?;
    set_room_option(server.pool(), room, "glModeratorAccessCode", "654321").await?;

    // Forced on by the provider
    set_rooms_configuration(server.pool(), "glRequireAuthentication", "default", "true").await?;
    // Forced off: the room's code is ignored
    set_rooms_configuration(server.pool(), "glModeratorAccessCode", "default", "false").await?;

    let (_, body) = get_public(&server, FRIENDLY_ID).await?;
    assert_eq!(body["data"]["require_authentication"], true);
    assert_eq!(body["data"]["moderator_access_code"], false);

    set_rooms_configuration(server.pool(), "glRequireAuthentication", "default", "false").await?;
    set_room_option(server.pool(), room, "glRequireAuthentication", "true").await?;

    let (_, body) = get_public(&server, FRIENDLY_ID).await?;
    assert_eq!(body["data"]["require_authentication"], false);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_public_show_for_created_room(pool: PgPool) -> Result<()> {
    let server = TestRoomsServer::spawn(pool).await?;
    let alice = create_test_user(server.pool(), "Alice").await?;

    set_rooms_configuration(server.pool(), "glViewerAccessCode", "default", "default_enabled")
        .await?;

    let created: Value = reqwest::Client::new()
        .post(format!("{}/api/v1/rooms", server.url()))
        .bearer_auth(server.token_for(alice)?)
        .json(&serde_json::json!({ "name": "Fresh Room", "user_id": alice }))
        .send()
        .await?
        .json()
        .await?;
    let friendly_id = created["data"]["friendly_id"].as_str().unwrap();

    let (status, body) = get_public(&server, friendly_id).await?;

    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Fresh Room");
    assert_eq!(body["data"]["viewer_access_code"], true);
    assert_eq!(body["data"]["moderator_access_code"], false);
    assert_eq!(body["data"]["require_authentication"], false);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_public_show_unknown_room_is_404(pool: PgPool) -> Result<()> {
    let server = TestRoomsServer::spawn(pool).await?;

    let (status, body) = get_public(&server, "zzz-zzz-zzz-zzz").await?;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = get_public(&server, "ZZZ-ZZZ-ZZZ-ZZZ").await?;
    assert_eq!(status, 404);

    Ok(())
}

// ============================================================================
// Mock settings getter
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_public_show_queries_settings_without_user(pool: PgPool) -> Result<()> {
    let mock = Arc::new(MockRoomSettingsGetter::with_settings(HashMap::from([
        ("glRequireAuthentication".to_string(), "true".to_string()),
        ("glViewerAccessCode".to_string(), "".to_string()),
        ("glModeratorAccessCode".to_string(), "true".to_string()),
        ("record".to_string(), "true".to_string()),
    ])));
    let server = TestRoomsServer::spawn_with_settings(pool, mock.clone()).await?;
    let alice = create_test_user(server.pool(), "Alice").await?;
    let room = create_test_room(server.pool(), alice, "Mocked", FRIENDLY_ID).await?;

    let (status, body) = get_public(&server, FRIENDLY_ID).await?;

    assert_eq!(status, 200);
    assert_eq!(body["data"]["require_authentication"], true);
    assert_eq!(body["data"]["viewer_access_code"], false);
    assert_eq!(body["data"]["moderator_access_code"], true);

    let queries = mock.queries();
    assert_eq!(queries.len(), 1);
    let query = &queries[0];
    assert_eq!(query.room_id, room);
    assert_eq!(query.provider, "default");
    assert_eq!(query.current_user_id, None);
    assert!(!query.show_codes);
    assert_eq!(
        query.settings,
        vec![
            "glRequireAuthentication".to_string(),
            "glViewerAccessCode".to_string(),
            "glModeratorAccessCode".to_string(),
        ]
    );

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_public_show_unknown_room_skips_settings(pool: PgPool) -> Result<()> {
    let mock = Arc::new(MockRoomSettingsGetter::with_settings(HashMap::new()));
    let server = TestRoomsServer::spawn_with_settings(pool, mock.clone()).await?;

    let (status, _) = get_public(&server, FRIENDLY_ID).await?;

    assert_eq!(status, 404);
    assert_eq!(mock.call_count(), 0);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_public_show_settings_failure_is_503(pool: PgPool) -> Result<()> {
    let mock = Arc::new(MockRoomSettingsGetter::failing());
    let server = TestRoomsServer::spawn_with_settings(pool, mock).await?;
    let alice = create_test_user(server.pool(), "Alice").await?;
    create_test_room(server.pool(), alice, "Mocked", FRIENDLY_ID).await?;

    let (status, body) = get_public(&server, FRIENDLY_ID).await?;

    assert_eq!(status, 503);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");

    Ok(())
}
