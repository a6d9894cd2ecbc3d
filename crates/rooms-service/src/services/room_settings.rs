//! Room settings retrieval.
//!
//! `RoomSettingsGetter` returns a room's meeting option values by name,
//! after provider overrides and access code masking. Handlers depend on the
//! trait so tests can observe how they delegate.

use crate::errors::RoomsError;
use crate::observability::metrics;
use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

pub const REQUIRE_AUTHENTICATION: &str = "glRequireAuthentication";
pub const VIEWER_ACCESS_CODE: &str = "glViewerAccessCode";
pub const MODERATOR_ACCESS_CODE: &str = "glModeratorAccessCode";

/// Parameters of a settings lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSettingsQuery {
    pub room_id: Uuid,
    pub provider: String,
    /// `None` for anonymous callers.
    pub current_user_id: Option<Uuid>,
    /// Return access codes in clear. Only honoured for a known current user.
    pub show_codes: bool,
    /// Option names to return.
    pub settings: Vec<String>,
}

/// Trait for settings retrieval (enables mocking).
#[async_trait::async_trait]
pub trait RoomSettingsGetter: Send + Sync {
    async fn get(&self, query: &RoomSettingsQuery) -> Result<HashMap<String, String>, RoomsError>;
}

/// True when a setting holds the literal `"true"`.
pub fn is_enabled(settings: &HashMap<String, String>, name: &str) -> bool {
    settings.get(name).is_some_and(|v| v == "true")
}

/// True when a setting holds a non-empty value.
pub fn is_present(settings: &HashMap<String, String>, name: &str) -> bool {
    settings.get(name).is_some_and(|v| !v.is_empty())
}

fn is_access_code(name: &str) -> bool {
    name == VIEWER_ACCESS_CODE || name == MODERATOR_ACCESS_CODE
}

/// A room option value with its provider policy.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SettingRow {
    name: String,
    value: String,
    default_value: String,
    true_value: String,
    config: Option<String>,
}

/// Apply provider overrides and access code masking.
fn resolve_settings(rows: Vec<SettingRow>, reveal_codes: bool) -> HashMap<String, String> {
    rows.into_iter()
        .map(|row| {
            let value = match row.config.as_deref() {
                Some("true") if !is_access_code(&row.name) => row.true_value,
                Some("false") => row.default_value,
                _ => row.value,
            };

            let value = if is_access_code(&row.name) && !reveal_codes {
                mask_access_code(&value)
            } else {
                value
            };

            (row.name, value)
        })
        .collect()
}

/// Masked codes keep presence: `"true"` when set, `""` when not.
fn mask_access_code(code: &str) -> String {
    if code.is_empty() {
        String::new()
    } else {
        "true".to_string()
    }
}

/// Database-backed settings getter.
pub struct DbRoomSettingsGetter {
    pool: PgPool,
}

impl DbRoomSettingsGetter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RoomSettingsGetter for DbRoomSettingsGetter {
    #[instrument(skip_all, name = "rooms.services.room_settings", fields(room_id = %query.room_id))]
    async fn get(&self, query: &RoomSettingsQuery) -> Result<HashMap<String, String>, RoomsError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, SettingRow>(
            r#"
            SELECT mo.name, rmo.value, mo.default_value, mo.true_value, rc.value AS config
            FROM room_meeting_options rmo
            JOIN meeting_options mo ON mo.meeting_option_id = rmo.meeting_option_id
            LEFT JOIN rooms_configurations rc
              ON rc.meeting_option_id = mo.meeting_option_id
             AND rc.provider = $2
            WHERE rmo.room_id = $1
              AND mo.name = ANY($3)
            "#,
        )
        .bind(query.room_id)
        .bind(&query.provider)
        .bind(&query.settings)
        .fetch_all(&self.pool)
        .await;

        let duration = start.elapsed();
        let rows = match result {
            Ok(rows) => {
                metrics::record_db_query("room_settings", "success", duration);
                rows
            }
            Err(e) => {
                metrics::record_db_query("room_settings", "error", duration);
                return Err(RoomsError::Database(format!("room_settings: {e}")));
            }
        };

        let reveal_codes = query.show_codes && query.current_user_id.is_some();
        Ok(resolve_settings(rows, reveal_codes))
    }
}

/// Mock settings getter for tests.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Returns preset values and records every query it receives.
    pub struct MockRoomSettingsGetter {
        settings: HashMap<String, String>,
        queries: Mutex<Vec<RoomSettingsQuery>>,
        return_error: bool,
    }

    impl MockRoomSettingsGetter {
        pub fn with_settings(settings: HashMap<String, String>) -> Self {
            Self {
                settings,
                queries: Mutex::new(Vec::new()),
                return_error: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                settings: HashMap::new(),
                queries: Mutex::new(Vec::new()),
                return_error: true,
            }
        }

        /// Queries received so far, oldest first.
        pub fn queries(&self) -> Vec<RoomSettingsQuery> {
            self.queries.lock().map(|q| q.clone()).unwrap_or_default()
        }

        pub fn call_count(&self) -> usize {
            self.queries.lock().map(|q| q.len()).unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl RoomSettingsGetter for MockRoomSettingsGetter {
        async fn get(
            &self,
            query: &RoomSettingsQuery,
        ) -> Result<HashMap<String, String>, RoomsError> {
            if let Ok(mut queries) = self.queries.lock() {
                queries.push(query.clone());
            }

            if self.return_error {
                return Err(RoomsError::ServiceUnavailable(
                    "Mock settings getter error".to_string(),
                ));
            }

            Ok(query
                .settings
                .iter()
                .filter_map(|name| {
                    self.settings
                        .get(name)
                        .map(|value| (name.clone(), value.clone()))
                })
                .collect())
        }
    }

}
