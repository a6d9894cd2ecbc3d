//! Database fixtures for rooms tests.
//!
//! Rows are inserted directly so tests can arrange state the API cannot
//! create itself (users, roles, recordings, avatars).

use sqlx::PgPool;
use uuid::Uuid;

/// Insert a user without a role.
pub async fn create_test_user(pool: &PgPool, name: &str) -> Result<Uuid, sqlx::Error> {
    create_test_user_with_permissions(pool, name, &[]).await
}

/// Insert a user whose role grants `permissions` (e.g. `"ManageRooms"`).
pub async fn create_test_user_with_permissions(
    pool: &PgPool,
    name: &str,
    permissions: &[&str],
) -> Result<Uuid, sqlx::Error> {
    let role_id: Option<Uuid> = if permissions.is_empty() {
        None
    } else {
        let (role_id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO roles (name, provider) VALUES ($1, 'default') RETURNING role_id",
        )
        .bind(format!("role-{}", Uuid::new_v4()))
        .fetch_one(pool)
        .await?;

        let names: Vec<String> = permissions.iter().map(ToString::to_string).collect();
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id, value)
            SELECT $1, permission_id, TRUE FROM permissions WHERE name = ANY($2)
            "#,
        )
        .bind(role_id)
        .bind(&names)
        .execute(pool)
        .await?;

        Some(role_id)
    };

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (name, email, provider, role_id)
        VALUES ($1, $2, 'default', $3)
        RETURNING user_id
        "#,
    )
    .bind(name)
    .bind(format!("{}@example.com", Uuid::new_v4()))
    .bind(role_id)
    .fetch_one(pool)
    .await?;

    Ok(user_id)
}

/// Insert a room with a fixed friendly id and no meeting options.
pub async fn create_test_room(
    pool: &PgPool,
    owner_id: Uuid,
    name: &str,
    friendly_id: &str,
) -> Result<Uuid, sqlx::Error> {
    let meeting_id = format!("{}00000000", Uuid::new_v4().simple());

    let (room_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO rooms (user_id, name, friendly_id, meeting_id)
        VALUES ($1, $2, $3, $4)
        RETURNING room_id
        "#,
    )
    .bind(owner_id)
    .bind(name)
    .bind(friendly_id)
    .bind(meeting_id)
    .fetch_one(pool)
    .await?;

    Ok(room_id)
}

/// Insert a recording for a room.
pub async fn create_test_recording(
    pool: &PgPool,
    room_id: Uuid,
    record_id: &str,
    name: &str,
) -> Result<Uuid, sqlx::Error> {
    let (recording_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO recordings (room_id, record_id, name, visibility, length, participants)
        VALUES ($1, $2, $3, 'Published', 42, 3)
        RETURNING recording_id
        "#,
    )
    .bind(room_id)
    .bind(record_id)
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(recording_id)
}

async fn insert_attachment(
    pool: &PgPool,
    record_type: &str,
    record_id: Uuid,
    name: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO attachments (record_type, record_id, name, filename, content_type, byte_size, data)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(record_type)
    .bind(record_id)
    .bind(name)
    .bind(filename)
    .bind(content_type)
    .bind(data.len() as i64)
    .bind(data)
    .execute(pool)
    .await?;

    Ok(())
}

/// Attach an avatar to a user.
pub async fn attach_test_avatar(
    pool: &PgPool,
    user_id: Uuid,
    content_type: &str,
    data: &[u8],
) -> Result<(), sqlx::Error> {
    insert_attachment(pool, "User", user_id, "avatar", "avatar.png", content_type, data).await
}

/// Attach a presentation to a room.
pub async fn attach_test_presentation(
    pool: &PgPool,
    room_id: Uuid,
    filename: &str,
) -> Result<(), sqlx::Error> {
    insert_attachment(
        pool,
        "Room",
        room_id,
        "presentation",
        filename,
        "application/pdf",
        b"%PDF-1.4 test",
    )
    .await
}

/// Set a room's stored value for a meeting option.
pub async fn set_room_option(
    pool: &PgPool,
    room_id: Uuid,
    option: &str,
    value: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO room_meeting_options (room_id, meeting_option_id, value)
        SELECT $1, meeting_option_id, $3 FROM meeting_options WHERE name = $2
        ON CONFLICT (room_id, meeting_option_id) DO UPDATE SET value = EXCLUDED.value
        "#,
    )
    .bind(room_id)
    .bind(option)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Set the provider policy for a meeting option.
pub async fn set_rooms_configuration(
    pool: &PgPool,
    option: &str,
    provider: &str,
    value: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO rooms_configurations (meeting_option_id, provider, value)
        SELECT meeting_option_id, $2, $3 FROM meeting_options WHERE name = $1
        ON CONFLICT (meeting_option_id, provider) DO UPDATE SET value = EXCLUDED.value
        "#,
    )
    .bind(option)
    .bind(provider)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// A room's stored value for a meeting option.
pub async fn room_option_value(
    pool: &PgPool,
    room_id: Uuid,
    option: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT rmo.value
        FROM room_meeting_options rmo
        JOIN meeting_options mo ON mo.meeting_option_id = rmo.meeting_option_id
        WHERE rmo.room_id = $1 AND mo.name = $2
        "#,
    )
    .bind(room_id)
    .bind(option)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(value,)| value))
}

/// Rows referencing a room, by table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoomRowCounts {
    pub rooms: i64,
    pub recordings: i64,
    pub options: i64,
    pub attachments: i64,
}

pub async fn count_room_rows(pool: &PgPool, room_id: Uuid) -> Result<RoomRowCounts, sqlx::Error> {
    let (rooms, recordings, options, attachments): (i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM rooms WHERE room_id = $1),
            (SELECT COUNT(*) FROM recordings WHERE room_id = $1),
            (SELECT COUNT(*) FROM room_meeting_options WHERE room_id = $1),
            (SELECT COUNT(*) FROM attachments WHERE record_type = 'Room' AND record_id = $1)
        "#,
    )
    .bind(room_id)
    .fetch_one(pool)
    .await?;

    Ok(RoomRowCounts {
        rooms,
        recordings,
        options,
        attachments,
    })
}

/// Look up a room id by friendly id.
pub async fn room_id_for(pool: &PgPool, friendly_id: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT room_id FROM rooms WHERE friendly_id = $1")
        .bind(friendly_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|(id,)| id))
}
