//! Repository layer for database operations.
//!
//! Repositories are unit structs with associated async functions taking a
//! pool (or an executor, when a caller needs them inside a transaction).
//! Every query records `rooms_db_*` metrics.

mod attachments;
mod recordings;
mod rooms;
mod users;

pub use attachments::{AttachmentsRepository, RecordType};
pub use recordings::RecordingsRepository;
pub use rooms::{DeletedRoom, RoomsRepository};
pub use users::UsersRepository;

use crate::errors::RoomsError;
use crate::observability::metrics;
use std::time::Instant;

/// Record query metrics and convert the sqlx error.
fn observe<T>(
    operation: &'static str,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> Result<T, RoomsError> {
    let duration = start.elapsed();
    match result {
        Ok(value) => {
            metrics::record_db_query(operation, "success", duration);
            Ok(value)
        }
        Err(e) => {
            metrics::record_db_query(operation, "error", duration);
            Err(RoomsError::Database(format!("{operation}: {e}")))
        }
    }
}

/// True when the error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
