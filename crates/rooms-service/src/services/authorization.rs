//! Authorization gate for room actions.
//!
//! Room-scoped actions are allowed for the room's owner or a holder of
//! `ManageRooms`. Creating a room for a user is allowed for that user or a
//! holder of `ManageUsers`. Resolving the room or target user is the
//! caller's job: an unknown room is NotFound before the gate runs, an
//! unknown target user is BadRequest after it.

use crate::errors::RoomsError;
use crate::models::{CurrentUser, Permission, RoomRow};
use uuid::Uuid;

/// Actions on an existing room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    Show,
    Update,
    PurgePresentation,
    Recordings,
    Destroy,
}

impl RoomAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomAction::Show => "show",
            RoomAction::Update => "update",
            RoomAction::PurgePresentation => "purge_presentation",
            RoomAction::Recordings => "recordings",
            RoomAction::Destroy => "destroy",
        }
    }
}

/// Decide whether `actor` may perform `action` on `room`.
///
/// # Errors
///
/// Returns `RoomsError::Forbidden` when the actor neither owns the room nor
/// holds `ManageRooms`.
pub fn authorize_room_action(
    actor: &CurrentUser,
    room: &RoomRow,
    action: RoomAction,
) -> Result<(), RoomsError> {
    if room.user_id == actor.user_id || actor.has_permission(Permission::ManageRooms) {
        return Ok(());
    }

    tracing::warn!(
        target: "rooms.services.authorization",
        user_id = %actor.user_id,
        room_id = %room.room_id,
        action = action.as_str(),
        "Room action denied"
    );
    Err(RoomsError::Forbidden(
        "You are not allowed to perform this action".to_string(),
    ))
}

/// Decide whether `actor` may create a room owned by `target_user_id`.
///
/// # Errors
///
/// Returns `RoomsError::Forbidden` when the target is another user and the
/// actor lacks `ManageUsers`.
pub fn authorize_room_creation(actor: &CurrentUser, target_user_id: Uuid) -> Result<(), RoomsError> {
    if actor.user_id == target_user_id || actor.has_permission(Permission::ManageUsers) {
        return Ok(());
    }

    tracing::warn!(
        target: "rooms.services.authorization",
        user_id = %actor.user_id,
        target_user_id = %target_user_id,
        "Room creation for another user denied"
    );
    Err(RoomsError::Forbidden(
        "You are not allowed to create rooms for this user".to_string(),
    ))
}
