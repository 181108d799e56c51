//! sqlx error classification shared by the Postgres adapters.

use crate::domain::foundation::{DomainError, ErrorCode};

/// SQLSTATE codes that mean "try again shortly".
const TRANSIENT_SQLSTATES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available
    "57014", // query_canceled (statement/lock timeout)
];

const UNIQUE_VIOLATION: &str = "23505";

/// Maps a sqlx error to a domain error. Lock contention and pool
/// exhaustion become `STORAGE_BUSY` so the retry policy picks them up.
pub(crate) fn map_sqlx_error(context: &str, err: sqlx::Error) -> DomainError {
    match &err {
        sqlx::Error::PoolTimedOut => {
            DomainError::storage_busy(format!("{}: connection pool exhausted", context))
        }
        sqlx::Error::Database(db_err)
            if db_err
                .code()
                .map_or(false, |code| TRANSIENT_SQLSTATES.contains(&code.as_ref())) =>
        {
            DomainError::storage_busy(format!("{}: {}", context, db_err))
        }
        _ => DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, err)),
    }
}

/// Returns the violated constraint name for a unique violation.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err)
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
        {
            db_err.constraint()
        }
        _ => None,
    }
}
