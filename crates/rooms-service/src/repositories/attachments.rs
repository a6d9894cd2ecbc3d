//! Named file attachments stored in Postgres.
//!
//! An owner record (room or user) has at most one attachment per name.

use super::observe;
use crate::errors::RoomsError;
use crate::models::{AttachmentBlob, AttachmentMeta, NewAttachment};
use sqlx::postgres::PgExecutor;
use std::collections::HashMap;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Kind of record an attachment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Room,
    User,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Room => "Room",
            RecordType::User => "User",
        }
    }
}

pub struct AttachmentsRepository;

impl AttachmentsRepository {
    #[instrument(skip_all, name = "rooms.repo.find_attachment", fields(record_type = record_type.as_str(), name = %name))]
    pub async fn find_meta<'e, E>(
        executor: E,
        record_type: RecordType,
        record_id: Uuid,
        name: &str,
    ) -> Result<Option<AttachmentMeta>, RoomsError>
    where
        E: PgExecutor<'e>,
    {
        let start = Instant::now();
        let result = sqlx::query_as::<_, AttachmentMeta>(
            r#"
            SELECT filename, content_type, byte_size
            FROM attachments
            WHERE record_type = $1 AND record_id = $2 AND name = $3
            "#,
        )
        .bind(record_type.as_str())
        .bind(record_id)
        .bind(name)
        .fetch_optional(executor)
        .await;

        observe("find_attachment", start, result)
    }

    /// Filenames of the `name` attachment for each of `record_ids` that has one.
    #[instrument(skip_all, name = "rooms.repo.attachment_filenames", fields(record_type = record_type.as_str(), count = record_ids.len()))]
    pub async fn filenames_for<'e, E>(
        executor: E,
        record_type: RecordType,
        record_ids: &[Uuid],
        name: &str,
    ) -> Result<HashMap<Uuid, String>, RoomsError>
    where
        E: PgExecutor<'e>,
    {
        if record_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let start = Instant::now();
        let result = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT record_id, filename
            FROM attachments
            WHERE record_type = $1 AND record_id = ANY($2) AND name = $3
            "#,
        )
        .bind(record_type.as_str())
        .bind(record_ids)
        .bind(name)
        .fetch_all(executor)
        .await;

        Ok(observe("attachment_filenames", start, result)?
            .into_iter()
            .collect())
    }

    #[instrument(skip_all, name = "rooms.repo.fetch_attachment", fields(record_type = record_type.as_str(), name = %name))]
    pub async fn find_blob<'e, E>(
        executor: E,
        record_type: RecordType,
        record_id: Uuid,
        name: &str,
    ) -> Result<Option<AttachmentBlob>, RoomsError>
    where
        E: PgExecutor<'e>,
    {
        let start = Instant::now();
        let result = sqlx::query_as::<_, AttachmentBlob>(
            r#"
            SELECT filename, content_type, data
            FROM attachments
            WHERE record_type = $1 AND record_id = $2 AND name = $3
            "#,
        )
        .bind(record_type.as_str())
        .bind(record_id)
        .bind(name)
        .fetch_optional(executor)
        .await;

        observe("fetch_attachment", start, result)
    }

    /// Attach `attachment` under `name`, replacing any existing one.
    #[instrument(skip_all, name = "rooms.repo.replace_attachment", fields(record_type = record_type.as_str(), name = %name))]
    pub async fn replace<'e, E>(
        executor: E,
        record_type: RecordType,
        record_id: Uuid,
        name: &str,
        attachment: &NewAttachment,
    ) -> Result<(), RoomsError>
    where
        E: PgExecutor<'e>,
    {
        let byte_size = i64::try_from(attachment.data.len()).map_err(|_| RoomsError::Internal)?;

        let start = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO attachments (record_type, record_id, name, filename, content_type, byte_size, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (record_type, record_id, name) DO UPDATE
            SET filename = EXCLUDED.filename,
                content_type = EXCLUDED.content_type,
                byte_size = EXCLUDED.byte_size,
                data = EXCLUDED.data,
                created_at = NOW()
            "#,
        )
        .bind(record_type.as_str())
        .bind(record_id)
        .bind(name)
        .bind(&attachment.filename)
        .bind(&attachment.content_type)
        .bind(byte_size)
        .bind(&attachment.data)
        .execute(executor)
        .await;

        observe("replace_attachment", start, result).map(|_| ())
    }

    /// Remove the named attachment. Returns whether one existed.
    #[instrument(skip_all, name = "rooms.repo.delete_attachment", fields(record_type = record_type.as_str(), name = %name))]
    pub async fn delete<'e, E>(
        executor: E,
        record_type: RecordType,
        record_id: Uuid,
        name: &str,
    ) -> Result<bool, RoomsError>
    where
        E: PgExecutor<'e>,
    {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            DELETE FROM attachments
            WHERE record_type = $1 AND record_id = $2 AND name = $3
            "#,
        )
        .bind(record_type.as_str())
        .bind(record_id)
        .bind(name)
        .execute(executor)
        .await;

        let done = observe("delete_attachment", start, result)?;
        Ok(done.rows_affected() > 0)
    }

    /// Remove every attachment of a record.
    pub async fn delete_all_for<'e, E>(
        executor: E,
        record_type: RecordType,
        record_id: Uuid,
    ) -> Result<u64, RoomsError>
    where
        E: PgExecutor<'e>,
    {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM attachments WHERE record_type = $1 AND record_id = $2")
            .bind(record_type.as_str())
            .bind(record_id)
            .execute(executor)
            .await;

        Ok(observe("delete_attachments", start, result)?.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_matches_schema_values() {
        assert_eq!(RecordType::Room.as_str(), "Room");
        assert_eq!(RecordType::User.as_str(), "User");
    }
}
