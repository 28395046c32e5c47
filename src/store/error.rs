//! Store Error Types

use std::time::Duration;
use thiserror::Error;

/// PostgreSQL SQLSTATE for `serialization_failure`
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";
/// PostgreSQL SQLSTATE for `deadlock_detected`
const SQLSTATE_DEADLOCK_DETECTED: &str = "40P01";
/// PostgreSQL SQLSTATE for `foreign_key_violation`
const SQLSTATE_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Rejected before any transaction is opened
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Source and destination accounts are the same")]
    SameAccount,

    #[error("Invalid amount: must be positive")]
    InvalidAmount,
}

/// Errors surfaced by the transactional executor and everything built on it.
///
/// Every variant carries the original database error; nothing is masked.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot begin transaction: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("statement failed: {0}")]
    Statement(#[from] sqlx::Error),

    #[error("tx err: {source}, rb err: {rollback}")]
    Rollback {
        #[source]
        source: Box<StoreError>,
        rollback: sqlx::Error,
    },

    #[error("commit failed: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("unit of work cancelled after {0:?}")]
    Cancelled(Duration),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StoreError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Connection(_) => "CONNECTION_ERROR",
            StoreError::Statement(e) if is_not_found(e) => "NOT_FOUND",
            StoreError::Statement(e) if has_sqlstate(e, SQLSTATE_FOREIGN_KEY_VIOLATION) => {
                "ACCOUNT_NOT_FOUND"
            }
            StoreError::Statement(_) => "STATEMENT_ERROR",
            StoreError::Rollback { .. } => "ROLLBACK_ERROR",
            StoreError::Commit(_) => "COMMIT_ERROR",
            StoreError::Cancelled(_) => "CANCELLED",
            StoreError::Validation(ValidationError::SameAccount) => "SAME_ACCOUNT",
            StoreError::Validation(ValidationError::InvalidAmount) => "INVALID_AMOUNT",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            StoreError::Statement(e) if is_not_found(e) => 404,
            StoreError::Statement(e) if has_sqlstate(e, SQLSTATE_FOREIGN_KEY_VIOLATION) => 400,
            StoreError::Validation(_) => 400,
            StoreError::Cancelled(_) => 504,
            StoreError::Connection(_)
            | StoreError::Statement(_)
            | StoreError::Rollback { .. }
            | StoreError::Commit(_) => 500,
        }
    }

    /// True for serialization failures and detected deadlocks.
    ///
    /// The store never retries; a caller that does must rerun the whole
    /// operation, which records a new transfer each time.
    pub fn is_retryable(&self) -> bool {
        let err = match self {
            StoreError::Statement(e) | StoreError::Commit(e) => e,
            StoreError::Rollback { source, .. } => return source.is_retryable(),
            _ => return false,
        };
        has_sqlstate(err, SQLSTATE_SERIALIZATION_FAILURE)
            || has_sqlstate(err, SQLSTATE_DEADLOCK_DETECTED)
    }
}

fn is_not_found(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::RowNotFound)
}

fn has_sqlstate(err: &sqlx::Error, code: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(code),
        _ => false,
    }
}
