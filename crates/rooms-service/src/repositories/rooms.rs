//! Rooms repository.
//!
//! Creation inserts the room together with its meeting options, deletion
//! removes the room with its recordings, options and attachments. Both run
//! in a single transaction.

use super::{is_unique_violation, observe, AttachmentsRepository, RecordType};
use crate::errors::RoomsError;
use crate::models::{NewAttachment, NewRoom, RoomRow, PRESENTATION_ATTACHMENT};
use crate::observability::metrics;
use sqlx::PgPool;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Rows removed together with a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletedRoom {
    pub recordings: u64,
    pub attachments: u64,
}

pub struct RoomsRepository;

impl RoomsRepository {
    /// Rooms owned by `owner_id`, newest first.
    ///
    /// `search` filters by case-insensitive substring of the name.
    #[instrument(skip_all, name = "rooms.repo.list_rooms", fields(owner_id = %owner_id))]
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<RoomRow>, RoomsError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let start = Instant::now();
        let result = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT room_id, user_id, name, friendly_id, meeting_id,
                   last_session, created_at, updated_at
            FROM rooms
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE $2)
            ORDER BY created_at DESC, room_id DESC
            "#,
        )
        .bind(owner_id)
        .bind(pattern)
        .fetch_all(pool)
        .await;

        observe("list_rooms", start, result)
    }

    #[instrument(skip_all, name = "rooms.repo.find_room")]
    pub async fn find_by_friendly_id(
        pool: &PgPool,
        friendly_id: &str,
    ) -> Result<Option<RoomRow>, RoomsError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT room_id, user_id, name, friendly_id, meeting_id,
                   last_session, created_at, updated_at
            FROM rooms
            WHERE friendly_id = $1
            "#,
        )
        .bind(friendly_id)
        .fetch_optional(pool)
        .await;

        observe("find_room", start, result)
    }

    /// Insert a room and its meeting options.
    ///
    /// Options the provider configures as `true` or `default_enabled` start
    /// with their enabled value (a generated code for access codes); all
    /// others start with their default.
    ///
    /// Returns `None` if the friendly id or meeting id is already taken, so
    /// the caller can retry with fresh identifiers.
    #[instrument(skip_all, name = "rooms.repo.create_room", fields(owner_id = %room.owner_id))]
    pub async fn create(
        pool: &PgPool,
        room: &NewRoom,
        provider: &str,
    ) -> Result<Option<RoomRow>, RoomsError> {
        let mut tx = pool.begin().await.map_err(|e| {
            RoomsError::Database(format!("Failed to start transaction: {}", e))
        })?;

        let start = Instant::now();
        let inserted = sqlx::query_as::<_, RoomRow>(
            r#"
            INSERT INTO rooms (user_id, name, friendly_id, meeting_id)
            VALUES ($1, $2, $3, $4)
            RETURNING room_id, user_id, name, friendly_id, meeting_id,
                      last_session, created_at, updated_at
            "#,
        )
        .bind(room.owner_id)
        .bind(&room.name)
        .bind(&room.friendly_id)
        .bind(&room.meeting_id)
        .fetch_one(&mut *tx)
        .await;

        if let Err(e) = &inserted {
            if is_unique_violation(e) {
                metrics::record_db_query("insert_room", "conflict", start.elapsed());
                tracing::debug!(target: "rooms.repo.rooms", "Room identifier collision");
                return Ok(None);
            }
        }
        let row = observe("insert_room", start, inserted)?;

        let start = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO room_meeting_options (room_id, meeting_option_id, value)
            SELECT
                $1,
                mo.meeting_option_id,
                CASE
                    WHEN rc.value IN ('true', 'default_enabled') THEN
                        CASE mo.name
                            WHEN 'glViewerAccessCode' THEN $3
                            WHEN 'glModeratorAccessCode' THEN $4
                            ELSE mo.true_value
                        END
                    ELSE mo.default_value
                END
            FROM meeting_options mo
            LEFT JOIN rooms_configurations rc
              ON rc.meeting_option_id = mo.meeting_option_id
             AND rc.provider = $2
            "#,
        )
        .bind(row.room_id)
        .bind(provider)
        .bind(&room.viewer_access_code)
        .bind(&room.moderator_access_code)
        .execute(&mut *tx)
        .await;
        let options = observe("insert_room_options", start, result)?;

        tx.commit()
            .await
            .map_err(|e| RoomsError::Database(format!("Failed to commit room creation: {}", e)))?;

        tracing::debug!(
            target: "rooms.repo.rooms",
            room_id = %row.room_id,
            option_count = options.rows_affected(),
            "Room created"
        );

        Ok(Some(row))
    }

    /// Rename the room and/or replace its presentation.
    ///
    /// Returns `None` if the room no longer exists.
    #[instrument(skip_all, name = "rooms.repo.update_room", fields(room_id = %room_id))]
    pub async fn update(
        pool: &PgPool,
        room_id: Uuid,
        name: Option<&str>,
        presentation: Option<&NewAttachment>,
    ) -> Result<Option<RoomRow>, RoomsError> {
        let mut tx = pool.begin().await.map_err(|e| {
            RoomsError::Database(format!("Failed to start transaction: {}", e))
        })?;

        let start = Instant::now();
        let result = sqlx::query_as::<_, RoomRow>(
            r#"
            UPDATE rooms
            SET name = COALESCE($2, name),
                updated_at = clock_timestamp()
            WHERE room_id = $1
            RETURNING room_id, user_id, name, friendly_id, meeting_id,
                      last_session, created_at, updated_at
            "#,
        )
        .bind(room_id)
        .bind(name)
        .fetch_optional(&mut *tx)
        .await;

        let Some(row) = observe("update_room", start, result)? else {
            return Ok(None);
        };

        if let Some(attachment) = presentation {
            AttachmentsRepository::replace(
                &mut *tx,
                RecordType::Room,
                room_id,
                PRESENTATION_ATTACHMENT,
                attachment,
            )
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| RoomsError::Database(format!("Failed to commit room update: {}", e)))?;

        Ok(Some(row))
    }

    /// Delete a room with everything that belongs to it.
    ///
    /// Returns `None` if the room no longer exists.
    #[instrument(skip_all, name = "rooms.repo.delete_room", fields(room_id = %room_id))]
    pub async fn delete(pool: &PgPool, room_id: Uuid) -> Result<Option<DeletedRoom>, RoomsError> {
        let mut tx = pool.begin().await.map_err(|e| {
            RoomsError::Database(format!("Failed to start transaction: {}", e))
        })?;

        let attachments =
            AttachmentsRepository::delete_all_for(&mut *tx, RecordType::Room, room_id).await?;

        let start = Instant::now();
        let result = sqlx::query("DELETE FROM recordings WHERE room_id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await;
        let recordings = observe("delete_recordings", start, result)?.rows_affected();

        let start = Instant::now();
        let result = sqlx::query("DELETE FROM room_meeting_options WHERE room_id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await;
        observe("delete_room_options", start, result)?;

        let start = Instant::now();
        let result = sqlx::query("DELETE FROM rooms WHERE room_id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await;
        let rooms = observe("delete_room", start, result)?.rows_affected();

        if rooms == 0 {
            // Dropping the transaction rolls it back.
            return Ok(None);
        }

        tx.commit()
            .await
            .map_err(|e| RoomsError::Database(format!("Failed to commit room deletion: {}", e)))?;

        Ok(Some(DeletedRoom {
            recordings,
            attachments,
        }))
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("standup"), "standup");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\tmp"), "c:\\\\tmp");
    }
}
