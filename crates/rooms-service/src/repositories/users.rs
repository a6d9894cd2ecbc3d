//! Users and their role permissions.

use super::observe;
use crate::errors::RoomsError;
use crate::models::{CurrentUser, UserRow};
use sqlx::PgPool;
use std::collections::HashSet;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

pub struct UsersRepository;

impl UsersRepository {
    #[instrument(skip_all, name = "rooms.repo.find_user", fields(user_id = %user_id))]
    pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRow>, RoomsError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, name, email, provider, role_id
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await;

        observe("find_user", start, result)
    }

    /// Names of the permissions granted (`value = true`) to the user's role.
    #[instrument(skip_all, name = "rooms.repo.user_permissions", fields(user_id = %user_id))]
    pub async fn permissions(pool: &PgPool, user_id: Uuid) -> Result<HashSet<String>, RoomsError> {
        let start = Instant::now();
        let result: Result<Vec<(String,)>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT p.name
            FROM users u
            JOIN role_permissions rp ON rp.role_id = u.role_id AND rp.value = TRUE
            JOIN permissions p ON p.permission_id = rp.permission_id
            WHERE u.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await;

        let rows = observe("user_permissions", start, result)?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Resolve the acting user with their permissions.
    ///
    /// Returns `None` if the user does not exist.
    pub async fn load_current_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<CurrentUser>, RoomsError> {
        let Some(user) = Self::find_by_id(pool, user_id).await? else {
            return Ok(None);
        };

        let permissions = Self::permissions(pool, user.user_id).await?;

        Ok(Some(CurrentUser {
            user_id: user.user_id,
            name: user.name,
            permissions,
        }))
    }
}
