use chrono::{DateTime, SecondsFormat, Utc};
use mm_core::error::StoreError;
use rusqlite::{Connection, ErrorCode};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid timestamp: {value}")]
    InvalidTimestamp { value: String },
    #[error("invalid count: {value}")]
    InvalidCount { value: i64 },
}

pub fn to_rfc3339(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn from_rfc3339(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DbError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Sorts a SQLite failure into retryable and non-retryable kinds.
pub fn classify(err: rusqlite::Error) -> StoreError {
    let message = err.to_string();
    match err.sqlite_error_code() {
        Some(
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure
            | ErrorCode::DiskFull
            | ErrorCode::OutOfMemory,
        ) => StoreError::Transient { message },
        Some(ErrorCode::ConstraintViolation) => StoreError::Consistency { message },
        _ => StoreError::Corrupt { message },
    }
}

/// Runs `f` inside a `BEGIN IMMEDIATE` transaction, which takes the write
/// lock up front so concurrent writers are serialized.
pub fn with_tx<T, F>(conn: &Connection, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&Connection) -> Result<T, StoreError>,
{
    conn.execute_batch("BEGIN IMMEDIATE").map_err(classify)?;
    match f(conn) {
        Ok(value) => {
            if let Err(err) = conn.execute_batch("COMMIT") {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(classify(err));
            }
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                error!(%rollback, %err, "rollback failed");
            }
            Err(err)
        }
    }
}

pub fn to_count(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt {
        message: DbError::InvalidCount { value }.to_string(),
    })
}
