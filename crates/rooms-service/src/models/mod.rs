//! Rooms service models.
//!
//! Database rows, the authenticated user, request bodies and response
//! payloads.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Minimum room name length (characters, after trimming).
pub const MIN_ROOM_NAME_LENGTH: usize = 2;

/// Maximum room name length (characters, after trimming).
pub const MAX_ROOM_NAME_LENGTH: usize = 255;

/// Attachment name of a room's presentation.
pub const PRESENTATION_ATTACHMENT: &str = "presentation";

/// Attachment name of a user's avatar.
pub const AVATAR_ATTACHMENT: &str = "avatar";

// ============================================================================
// Permissions and the acting user
// ============================================================================

/// Named permissions consulted by the authorization gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Act on rooms owned by other users.
    ManageRooms,

    /// Create rooms on behalf of other users.
    ManageUsers,
}

impl Permission {
    /// Name of the permission as stored in the `permissions` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageRooms => "ManageRooms",
            Permission::ManageUsers => "ManageUsers",
        }
    }
}

/// The authenticated user making the request.
///
/// Resolved from the bearer token subject by the auth middleware and placed
/// in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub name: String,
    pub permissions: HashSet<String>,
}

impl CurrentUser {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(permission.as_str())
    }
}

// ============================================================================
// Database rows
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub provider: String,
    pub role_id: Option<Uuid>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomRow {
    pub room_id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    pub name: String,
    pub friendly_id: String,
    pub meeting_id: String,
    pub last_session: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordingRow {
    pub recording_id: Uuid,
    pub room_id: Uuid,
    pub record_id: String,
    pub name: String,
    pub visibility: String,
    pub length: i32,
    pub participants: i32,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Attachment metadata, without the stored bytes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttachmentMeta {
    pub filename: String,
    pub content_type: String,
    pub byte_size: i64,
}

/// A stored attachment including its bytes.
#[derive(Clone, sqlx::FromRow)]
pub struct AttachmentBlob {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An attachment about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A room about to be inserted, with its generated identifiers.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub owner_id: Uuid,
    pub name: String,
    pub friendly_id: String,
    pub meeting_id: String,

    /// Used only if the provider enables viewer access codes for new rooms.
    pub viewer_access_code: String,

    /// Used only if the provider enables moderator access codes for new rooms.
    pub moderator_access_code: String,
}

// ============================================================================
// Requests
// ============================================================================

/// Validate and normalize a room name.
///
/// # Errors
///
/// Returns an error message if the trimmed name is outside the allowed length.
pub fn normalize_room_name(name: &str) -> Result<String, &'static str> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();

    if length < MIN_ROOM_NAME_LENGTH {
        return Err("Room name must be at least 2 characters");
    }
    if length > MAX_ROOM_NAME_LENGTH {
        return Err("Room name must be at most 255 characters");
    }

    Ok(trimmed.to_string())
}

/// Body of `POST /api/v1/rooms`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRoomRequest {
    pub name: String,

    /// Owner of the new room.
    pub user_id: Uuid,
}

/// Uploaded presentation, `data` is standard base64.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresentationUpload {
    pub filename: String,
    pub content_type: String,
    pub data: String,
}

impl PresentationUpload {
    /// Decode into an attachment ready to store.
    ///
    /// # Errors
    ///
    /// Returns an error message if the filename is blank or `data` is not
    /// valid base64.
    pub fn decode(&self) -> Result<NewAttachment, &'static str> {
        let filename = self.filename.trim();
        if filename.is_empty() {
            return Err("Presentation filename is required");
        }

        let data = STANDARD
            .decode(self.data.as_bytes())
            .map_err(|_| "Presentation data must be base64 encoded")?;

        Ok(NewAttachment {
            filename: filename.to_string(),
            content_type: self.content_type.trim().to_ascii_lowercase(),
            data,
        })
    }
}

/// Body of `PATCH /api/v1/rooms/:friendly_id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoomRequest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub presentation: Option<PresentationUpload>,
}

impl UpdateRoomRequest {
    pub fn has_changes(&self) -> bool {
        self.name.is_some() || self.presentation.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexQuery {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShowQuery {
    #[serde(default)]
    pub include_owner: Option<bool>,
}

// ============================================================================
// Responses
// ============================================================================

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// A room as returned to its owner or a `ManageRooms` holder.
#[derive(Debug, Clone, Serialize)]
pub struct RoomResponse {
    pub id: Uuid,
    pub friendly_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_session: Option<DateTime<Utc>>,

    /// Filename of the current presentation, if one is attached.
    pub presentation_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,

    /// URL of the owner's avatar; present only when one is attached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_avatar: Option<String>,
}

impl RoomResponse {
    pub fn from_row(room: &RoomRow, presentation_name: Option<String>) -> Self {
        Self {
            id: room.room_id,
            friendly_id: room.friendly_id.clone(),
            name: room.name.clone(),
            created_at: room.created_at,
            last_session: room.last_session,
            presentation_name,
            owner_name: None,
            owner_avatar: None,
        }
    }
}

/// A room as shown to anyone holding its link.
#[derive(Debug, Clone, Serialize)]
pub struct PublicRoomResponse {
    pub name: String,
    pub require_authentication: bool,
    pub viewer_access_code: bool,
    pub moderator_access_code: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingResponse {
    /// External recording id.
    pub id: String,
    pub name: String,
    pub visibility: String,
    /// Minutes.
    pub length: i32,
    pub participants: i32,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<RecordingRow> for RecordingResponse {
    fn from(row: RecordingRow) -> Self {
        Self {
            id: row.record_id,
            name: row.name,
            visibility: row.visibility,
            length: row.length,
            participants: row.participants,
            recorded_at: row.recorded_at,
            created_at: row.created_at,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy".
    pub status: &'static str,

    pub provider: String,

    /// "healthy" or "unhealthy".
    pub database: &'static str,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_room_name_trims() {
        assert_eq!(normalize_room_name("  Team sync  ").unwrap(), "Team sync");
    }

    #[test]
    fn test_normalize_room_name_bounds() {
        assert!(normalize_room_name("a").is_err());
        assert!(normalize_room_name("   a   ").is_err());
        assert!(normalize_room_name("ab").is_ok());
        assert!(normalize_room_name(&"x".repeat(255)).is_ok());
        assert!(normalize_room_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_normalize_room_name_counts_characters_not_bytes() {
        // 255 two-byte characters
        let name = "é".repeat(255);
        assert!(normalize_room_name(&name).is_ok());
    }

    #[test]
    fn test_create_room_request_rejects_unknown_fields() {
        let user_id = Uuid::new_v4();
        let ok: Result<CreateRoomRequest, _> =
            serde_json::from_str(&format!(r#"{{"name":"Room","user_id":"{user_id}"}}"#));
        assert_eq!(ok.unwrap().user_id, user_id);

        let extra: Result<CreateRoomRequest, _> = serde_json::from_str(&format!(
            r#"{{"name":"Room","user_id":"{user_id}","friendly_id":"abc-def-ghi-jkl"}}"#
        ));
        assert!(extra.is_err());
    }

    #[test]
    fn test_update_room_request_has_changes() {
        let empty: UpdateRoomRequest = serde_json::from_str("{}").unwrap();
        assert!(!empty.has_changes());

        let renamed: UpdateRoomRequest = serde_json::from_str(r#"{"name":"New"}"#).unwrap();
        assert!(renamed.has_changes());
    }

    #[test]
    fn test_presentation_decode() {
        let upload = PresentationUpload {
            filename: " slides.pdf ".to_string(),
            content_type: "Application/PDF".to_string(),
            data: STANDARD.encode(b"%PDF-1.4"),
        };

        let decoded = upload.decode().unwrap();
        assert_eq!(decoded.filename, "slides.pdf");
        assert_eq!(decoded.content_type, "application/pdf");
        assert_eq!(decoded.data, b"%PDF-1.4");
    }

    #[test]
    fn test_presentation_decode_rejects_bad_input() {
        let bad_data = PresentationUpload {
            filename: "slides.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: "not base64!".to_string(),
        };
        assert!(bad_data.decode().is_err());

        let blank_name = PresentationUpload {
            filename: "  ".to_string(),
            content_type: "application/pdf".to_string(),
            data: String::new(),
        };
        assert!(blank_name.decode().is_err());
    }

    #[test]
    fn test_current_user_permissions() {
        let user = CurrentUser {
            user_id: Uuid::new_v4(),
            name: "Admin".to_string(),
            permissions: HashSet::from(["ManageRooms".to_string()]),
        };

        assert!(user.has_permission(Permission::ManageRooms));
        assert!(!user.has_permission(Permission::ManageUsers));
    }

    #[test]
    fn test_room_response_omits_owner_fields_when_absent() {
        let now = Utc::now();
        let row = RoomRow {
            room_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Room".to_string(),
            friendly_id: "abc-def-ghi-jkl".to_string(),
            meeting_id: "a".repeat(40),
            last_session: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(RoomResponse::from_row(&row, None)).unwrap();
        assert_eq!(json["friendly_id"], "abc-def-ghi-jkl");
        assert!(json.get("owner_name").is_none());
        assert!(json.get("owner_avatar").is_none());
        assert!(json.get("meeting_id").is_none());
        assert!(json["presentation_name"].is_null());
    }
}
