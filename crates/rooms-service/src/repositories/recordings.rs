//! Recordings of a room.

use super::observe;
use crate::errors::RoomsError;
use crate::models::RecordingRow;
use sqlx::PgPool;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

pub struct RecordingsRepository;

impl RecordingsRepository {
    /// A room's recordings in creation order.
    #[instrument(skip_all, name = "rooms.repo.list_recordings", fields(room_id = %room_id))]
    pub async fn list_for_room(
        pool: &PgPool,
        room_id: Uuid,
    ) -> Result<Vec<RecordingRow>, RoomsError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, RecordingRow>(
            r#"
            SELECT recording_id, room_id, record_id, name, visibility,
                   length, participants, recorded_at, created_at
            FROM recordings
            WHERE room_id = $1
            ORDER BY created_at ASC, recording_id ASC
            "#,
        )
        .bind(room_id)
        .fetch_all(pool)
        .await;

        observe("list_recordings", start, result)
    }
}
