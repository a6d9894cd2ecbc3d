//! User avatar handler.
//!
//! `GET /api/v1/users/{user_id}/avatar` serves the stored bytes. This is the
//! URL reported as `owner_avatar` on room responses.

use crate::errors::RoomsError;
use crate::models::AVATAR_ATTACHMENT;
use crate::repositories::{AttachmentsRepository, RecordType};
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[instrument(skip_all, name = "rooms.handlers.avatar")]
pub async fn show_avatar(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Response, RoomsError> {
    let not_found = || RoomsError::NotFound("Avatar not found".to_string());

    let user_id = Uuid::parse_str(&user_id).map_err(|_| not_found())?;

    let blob = AttachmentsRepository::find_blob(
        &state.pool,
        RecordType::User,
        user_id,
        AVATAR_ATTACHMENT,
    )
    .await?
    .ok_or_else(not_found)?;

    let content_type = HeaderValue::from_str(&blob.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("private, max-age=300"),
            ),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        ],
        blob.data,
    )
        .into_response())
}
