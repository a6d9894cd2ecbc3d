//! Room handlers.
//!
//! - `GET /api/v1/rooms` - rooms owned by the caller
//! - `POST /api/v1/rooms` - create a room for the caller or another user
//! - `GET /api/v1/rooms/{friendly_id}` - show a room
//! - `GET /api/v1/rooms/{friendly_id}/public` - public room info (no auth)
//! - `PATCH /api/v1/rooms/{friendly_id}` - rename / replace presentation
//! - `DELETE /api/v1/rooms/{friendly_id}/purge_presentation` - remove presentation
//! - `DELETE /api/v1/rooms/{friendly_id}` - delete with recordings
//! - `GET /api/v1/rooms/{friendly_id}/recordings` - list recordings
//!
//! Rooms are resolved by friendly id before the authorization gate runs, so
//! an unknown room is always 404 and never 403.

use crate::errors::RoomsError;
use crate::models::{
    normalize_room_name, CreateRoomRequest, CurrentUser, DataResponse, IndexQuery, NewRoom,
    PublicRoomResponse, RecordingResponse, RoomResponse, RoomRow, ShowQuery, UpdateRoomRequest,
    AVATAR_ATTACHMENT, PRESENTATION_ATTACHMENT,
};
use crate::observability::metrics;
use crate::repositories::{
    AttachmentsRepository, RecordType, RecordingsRepository, RoomsRepository, UsersRepository,
};
use crate::routes::AppState;
use crate::services::identifiers::{
    generate_access_code, generate_friendly_id, generate_meeting_id,
};
use crate::services::room_settings::{
    is_enabled, is_present, MODERATOR_ACCESS_CODE, REQUIRE_AUTHENTICATION, VIEWER_ACCESS_CODE,
};
use crate::services::{authorize_room_action, authorize_room_creation, RoomAction, RoomSettingsQuery};
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use common::types::FriendlyId;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Maximum attempts to find an unused friendly id on create.
const MAX_FRIENDLY_ID_COLLISION_RETRIES: usize = 3;

/// Content types accepted for presentations.
const ALLOWED_PRESENTATION_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.oasis.opendocument.text",
    "application/vnd.oasis.opendocument.presentation",
    "application/vnd.oasis.opendocument.spreadsheet",
    "application/vnd.oasis.opendocument.graphics",
    "application/rtf",
    "text/plain",
    "image/png",
    "image/jpeg",
];

type DataJson<T> = Json<DataResponse<T>>;

/// Record the outcome of a room operation and pass the result through.
fn finish<T>(operation: &'static str, result: Result<T, RoomsError>) -> Result<T, RoomsError> {
    match &result {
        Ok(_) => metrics::record_room_operation(operation, "success"),
        Err(e) => metrics::record_room_operation(operation, e.error_type()),
    }
    result
}

// ============================================================================
// Handler: GET /api/v1/rooms
// ============================================================================

/// Rooms owned by the caller, newest first. `?search=` filters by name.
#[instrument(skip_all, name = "rooms.handlers.index", fields(user_id = %current_user.user_id))]
pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    query: Result<Query<IndexQuery>, QueryRejection>,
) -> Result<DataJson<Vec<RoomResponse>>, RoomsError> {
    let result = async {
        let Query(query) = query.map_err(bad_query)?;

        let rooms = RoomsRepository::list_for_owner(
            &state.pool,
            current_user.user_id,
            query.search.as_deref(),
        )
        .await?;

        let ids: Vec<Uuid> = rooms.iter().map(|r| r.room_id).collect();
        let mut presentations = AttachmentsRepository::filenames_for(
            &state.pool,
            RecordType::Room,
            &ids,
            PRESENTATION_ATTACHMENT,
        )
        .await?;

        let rooms: Vec<RoomResponse> = rooms
            .iter()
            .map(|room| RoomResponse::from_row(room, presentations.remove(&room.room_id)))
            .collect();

        Ok::<_, RoomsError>(rooms)
    }
    .await;

    finish("index", result).map(|rooms| Json(DataResponse::new(rooms)))
}

// ============================================================================
// Handler: POST /api/v1/rooms
// ============================================================================

/// Create a room owned by `user_id`.
///
/// # Response
///
/// - 201 Created: the new room
/// - 400 Bad Request: malformed body, invalid name, or unknown `user_id`
/// - 403 Forbidden: `user_id` is another user and the caller lacks `ManageUsers`
#[instrument(skip_all, name = "rooms.handlers.create", fields(user_id = %current_user.user_id))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, DataJson<RoomResponse>), RoomsError> {
    let result = match body {
        Ok(body) => create_room(&state, &current_user, &body).await,
        Err(rejection) => Err(bad_body(rejection)),
    };

    finish("create", result).map(|room| (StatusCode::CREATED, Json(DataResponse::new(room))))
}

async fn create_room(
    state: &AppState,
    current_user: &CurrentUser,
    body: &[u8],
) -> Result<RoomResponse, RoomsError> {
    // Parsed by hand so malformed bodies are 400 rather than axum's 422.
    let request: CreateRoomRequest = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "rooms.handlers.rooms", error = %e, "Invalid request body");
        RoomsError::BadRequest("Invalid request body".to_string())
    })?;

    authorize_room_creation(current_user, request.user_id)?;

    let name = normalize_room_name(&request.name)
        .map_err(|msg| RoomsError::BadRequest(msg.to_string()))?;

    if UsersRepository::find_by_id(&state.pool, request.user_id)
        .await?
        .is_none()
    {
        tracing::debug!(
            target: "rooms.handlers.rooms",
            target_user_id = %request.user_id,
            "Room owner does not exist"
        );
        return Err(RoomsError::BadRequest("User does not exist".to_string()));
    }

    for attempt in 1..=MAX_FRIENDLY_ID_COLLISION_RETRIES {
        let new_room = NewRoom {
            owner_id: request.user_id,
            name: name.clone(),
            friendly_id: generate_friendly_id()?.to_string(),
            meeting_id: generate_meeting_id()?,
            viewer_access_code: generate_access_code()?,
            moderator_access_code: generate_access_code()?,
        };

        if let Some(room) =
            RoomsRepository::create(&state.pool, &new_room, &state.config.provider).await?
        {
            info!(
                target: "rooms.handlers.rooms",
                room_id = %room.room_id,
                owner_id = %room.user_id,
                created_by = %current_user.user_id,
                "Room created"
            );
            return Ok(RoomResponse::from_row(&room, None));
        }

        tracing::debug!(target: "rooms.handlers.rooms", attempt, "Friendly id collision, retrying");
    }

    tracing::error!(target: "rooms.handlers.rooms", "Failed to generate a unique friendly id");
    Err(RoomsError::Internal)
}

// ============================================================================
// Handler: GET /api/v1/rooms/{friendly_id}
// ============================================================================

/// Show a room. `?include_owner=true` adds the owner's name and avatar URL.
#[instrument(skip_all, name = "rooms.handlers.show", fields(user_id = %current_user.user_id))]
pub async fn show(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(friendly_id): Path<String>,
    query: Result<Query<ShowQuery>, QueryRejection>,
) -> Result<DataJson<RoomResponse>, RoomsError> {
    let result = async {
        let Query(query) = query.map_err(bad_query)?;

        let room = find_room(&state.pool, &friendly_id).await?;
        authorize_room_action(&current_user, &room, RoomAction::Show)?;

        let mut response = room_response(&state.pool, &room).await?;

        if query.include_owner.unwrap_or(false) {
            let owner = UsersRepository::find_by_id(&state.pool, room.user_id)
                .await?
                .ok_or(RoomsError::Internal)?;

            let avatar = AttachmentsRepository::find_meta(
                &state.pool,
                RecordType::User,
                owner.user_id,
                AVATAR_ATTACHMENT,
            )
            .await?;

            response.owner_name = Some(owner.name);
            response.owner_avatar = avatar.map(|_| avatar_url(owner.user_id));
        }

        Ok::<_, RoomsError>(response)
    }
    .await;

    finish("show", result).map(|room| Json(DataResponse::new(room)))
}

// ============================================================================
// Handler: GET /api/v1/rooms/{friendly_id}/public
// ============================================================================

/// Public room information for anyone holding the link.
///
/// Access codes are only reported as present or absent.
#[instrument(skip_all, name = "rooms.handlers.public_show")]
pub async fn public_show(
    State(state): State<Arc<AppState>>,
    Path(friendly_id): Path<String>,
) -> Result<DataJson<PublicRoomResponse>, RoomsError> {
    let result = async {
        let room = find_room(&state.pool, &friendly_id).await?;

        let settings = state
            .settings_getter
            .get(&RoomSettingsQuery {
                room_id: room.room_id,
                provider: state.config.provider.clone(),
                current_user_id: None,
                show_codes: false,
                settings: vec![
                    REQUIRE_AUTHENTICATION.to_string(),
                    VIEWER_ACCESS_CODE.to_string(),
                    MODERATOR_ACCESS_CODE.to_string(),
                ],
            })
            .await?;

        Ok::<_, RoomsError>(PublicRoomResponse {
            name: room.name,
            require_authentication: is_enabled(&settings, REQUIRE_AUTHENTICATION),
            viewer_access_code: is_present(&settings, VIEWER_ACCESS_CODE),
            moderator_access_code: is_present(&settings, MODERATOR_ACCESS_CODE),
        })
    }
    .await;

    finish("public_show", result).map(|room| Json(DataResponse::new(room)))
}

// ============================================================================
// Handler: PATCH /api/v1/rooms/{friendly_id}
// ============================================================================

/// Rename a room and/or replace its presentation.
///
/// # Response
///
/// - 200 OK: the updated room
/// - 400 Bad Request: malformed body, no changes, invalid name, bad
///   presentation data or content type
/// - 413 Payload Too Large: presentation exceeds the configured limit
#[instrument(skip_all, name = "rooms.handlers.update", fields(user_id = %current_user.user_id))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(friendly_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<DataJson<RoomResponse>, RoomsError> {
    let body = body.map_err(bad_body);
    let result = update_room(&state, &current_user, &friendly_id, body).await;

    finish("update", result).map(|room| Json(DataResponse::new(room)))
}

async fn update_room(
    state: &AppState,
    current_user: &CurrentUser,
    friendly_id: &str,
    body: Result<Bytes, RoomsError>,
) -> Result<RoomResponse, RoomsError> {
    let room = find_room(&state.pool, friendly_id).await?;
    authorize_room_action(current_user, &room, RoomAction::Update)?;

    let body = body?;
    let request: UpdateRoomRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "rooms.handlers.rooms", error = %e, "Invalid request body");
        RoomsError::BadRequest("Invalid request body".to_string())
    })?;

    if !request.has_changes() {
        return Err(RoomsError::BadRequest("No changes provided".to_string()));
    }

    let name = request
        .name
        .as_deref()
        .map(normalize_room_name)
        .transpose()
        .map_err(|msg| RoomsError::BadRequest(msg.to_string()))?;

    let presentation = match &request.presentation {
        Some(upload) => {
            let attachment = upload
                .decode()
                .map_err(|msg| RoomsError::BadRequest(msg.to_string()))?;

            if attachment.data.len() > state.config.max_presentation_bytes {
                return Err(RoomsError::PayloadTooLarge(format!(
                    "Presentation must be at most {} bytes",
                    state.config.max_presentation_bytes
                )));
            }

            if !ALLOWED_PRESENTATION_CONTENT_TYPES.contains(&attachment.content_type.as_str()) {
                return Err(RoomsError::BadRequest(
                    "Unsupported presentation content type".to_string(),
                ));
            }

            Some(attachment)
        }
        None => None,
    };

    let updated = RoomsRepository::update(
        &state.pool,
        room.room_id,
        name.as_deref(),
        presentation.as_ref(),
    )
    .await?
    .ok_or_else(room_not_found)?;

    info!(
        target: "rooms.handlers.rooms",
        room_id = %updated.room_id,
        renamed = name.is_some(),
        presentation_replaced = presentation.is_some(),
        "Room updated"
    );

    room_response(&state.pool, &updated).await
}

// ============================================================================
// Handler: DELETE /api/v1/rooms/{friendly_id}/purge_presentation
// ============================================================================

/// Remove the room's presentation. Succeeds when there is none.
#[instrument(skip_all, name = "rooms.handlers.purge_presentation", fields(user_id = %current_user.user_id))]
pub async fn purge_presentation(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(friendly_id): Path<String>,
) -> Result<DataJson<()>, RoomsError> {
    let result = async {
        let room = find_room(&state.pool, &friendly_id).await?;
        authorize_room_action(&current_user, &room, RoomAction::PurgePresentation)?;

        let removed = AttachmentsRepository::delete(
            &state.pool,
            RecordType::Room,
            room.room_id,
            PRESENTATION_ATTACHMENT,
        )
        .await?;

        info!(target: "rooms.handlers.rooms", room_id = %room.room_id, removed, "Presentation purged");
        Ok::<_, RoomsError>(())
    }
    .await;

    finish("purge_presentation", result).map(|()| Json(DataResponse::new(())))
}

// ============================================================================
// Handler: DELETE /api/v1/rooms/{friendly_id}
// ============================================================================

/// Delete a room together with its recordings, settings and presentation.
#[instrument(skip_all, name = "rooms.handlers.destroy", fields(user_id = %current_user.user_id))]
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(friendly_id): Path<String>,
) -> Result<DataJson<()>, RoomsError> {
    let result = async {
        let room = find_room(&state.pool, &friendly_id).await?;
        authorize_room_action(&current_user, &room, RoomAction::Destroy)?;

        let deleted = RoomsRepository::delete(&state.pool, room.room_id)
            .await?
            .ok_or_else(room_not_found)?;

        info!(
            target: "rooms.handlers.rooms",
            room_id = %room.room_id,
            deleted_by = %current_user.user_id,
            recordings = deleted.recordings,
            attachments = deleted.attachments,
            "Room deleted"
        );
        Ok::<_, RoomsError>(())
    }
    .await;

    finish("destroy", result).map(|()| Json(DataResponse::new(())))
}

// ============================================================================
// Handler: GET /api/v1/rooms/{friendly_id}/recordings
// ============================================================================

/// The room's recordings in creation order.
#[instrument(skip_all, name = "rooms.handlers.recordings", fields(user_id = %current_user.user_id))]
pub async fn recordings(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(friendly_id): Path<String>,
) -> Result<DataJson<Vec<RecordingResponse>>, RoomsError> {
    let result = async {
        let room = find_room(&state.pool, &friendly_id).await?;
        authorize_room_action(&current_user, &room, RoomAction::Recordings)?;

        let rows = RecordingsRepository::list_for_room(&state.pool, room.room_id).await?;
        let recordings: Vec<RecordingResponse> =
            rows.into_iter().map(RecordingResponse::from).collect();

        Ok::<_, RoomsError>(recordings)
    }
    .await;

    finish("recordings", result).map(|recordings| Json(DataResponse::new(recordings)))
}

// ============================================================================
// Helpers
// ============================================================================

fn room_not_found() -> RoomsError {
    RoomsError::NotFound("Room not found".to_string())
}

fn bad_query(rejection: QueryRejection) -> RoomsError {
    tracing::debug!(target: "rooms.handlers.rooms", error = %rejection, "Invalid query string");
    RoomsError::BadRequest("Invalid query parameters".to_string())
}

/// Bodies over the request limit are 413, any other read failure is 400.
fn bad_body(rejection: BytesRejection) -> RoomsError {
    tracing::debug!(target: "rooms.handlers.rooms", error = %rejection, "Unreadable request body");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RoomsError::PayloadTooLarge("Request body too large".to_string())
    } else {
        RoomsError::BadRequest("Invalid request body".to_string())
    }
}

/// Resolve a room by friendly id. Malformed ids are reported as not found.
async fn find_room(pool: &PgPool, friendly_id: &str) -> Result<RoomRow, RoomsError> {
    let friendly_id = FriendlyId::parse(friendly_id).map_err(|_| room_not_found())?;

    RoomsRepository::find_by_friendly_id(pool, friendly_id.as_str())
        .await?
        .ok_or_else(room_not_found)
}

async fn room_response(pool: &PgPool, room: &RoomRow) -> Result<RoomResponse, RoomsError> {
    let presentation = AttachmentsRepository::find_meta(
        pool,
        RecordType::Room,
        room.room_id,
        PRESENTATION_ATTACHMENT,
    )
    .await?;

    Ok(RoomResponse::from_row(room, presentation.map(|p| p.filename)))
}

/// Public URL of a user's avatar.
pub fn avatar_url(user_id: Uuid) -> String {
    format!("/api/v1/users/{user_id}/avatar")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_url() {
        let id = Uuid::nil();
        assert_eq!(
            avatar_url(id),
            "/api/v1/users/00000000-0000-0000-0000-000000000000/avatar"
        );
    }

    #[test]
    fn test_presentation_content_types_are_lowercase() {
        for content_type in ALLOWED_PRESENTATION_CONTENT_TYPES {
            assert_eq!(*content_type, content_type.to_ascii_lowercase());
        }
        assert!(!ALLOWED_PRESENTATION_CONTENT_TYPES.contains(&"image/svg+xml"));
        assert!(!ALLOWED_PRESENTATION_CONTENT_TYPES.contains(&"text/html"));
    }

    #[test]
    fn test_finish_passes_result_through() {
        assert_eq!(finish("show", Ok::<_, RoomsError>(7)).ok(), Some(7));
        assert!(matches!(
            finish::<()>("show", Err(room_not_found())),
            Err(RoomsError::NotFound(_))
        ));
    }
}
