//! Error types for ledger operations.

use thiserror::Error;

/// SQLSTATE for `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE for `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";
/// SQLSTATE for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Main error type for ledger and transfer operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Referenced account, entry or transfer does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Malformed input.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
        field: Option<&'static str>,
    },

    /// Storage engine error inside a session.
    #[error("Transaction failed: {0}")]
    TransactionFailed(#[source] sqlx::Error),

    /// The session failed and rolling it back failed as well.
    #[error("Transaction failed: {error}; rollback failed: {rollback}")]
    RollbackFailed {
        #[source]
        error: Box<LedgerError>,
        rollback: sqlx::Error,
    },
}

impl LedgerError {
    /// Create a not-found error for an entity.
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create an invalid-argument error for a field.
    pub fn invalid_argument(field: &'static str, message: impl Into<String>) -> Self {
        LedgerError::InvalidArgument {
            message: message.into(),
            field: Some(field),
        }
    }

    /// Get error code for callers that map errors onto an outer protocol.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::NotFound { .. } => "NOT_FOUND",
            LedgerError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            LedgerError::TransactionFailed(_) | LedgerError::RollbackFailed { .. } => {
                "TRANSACTION_FAILED"
            }
        }
    }

    /// Check if the whole operation may succeed when retried.
    ///
    /// Only transient concurrency conflicts reported by the engine qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::TransactionFailed(err) => matches!(
                sqlstate(err).as_deref(),
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
            ),
            LedgerError::RollbackFailed { error, .. } => error.is_retryable(),
            _ => false,
        }
    }

    /// Map a foreign-key violation on `constraint_hint` onto `NotFound`.
    ///
    /// Any other error passes through unchanged.
    pub(crate) fn foreign_key(
        self,
        constraint_hint: &str,
        entity: &'static str,
        id: impl Into<i64>,
    ) -> Self {
        let violated = match &self {
            LedgerError::TransactionFailed(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION)
                    && db_err
                        .constraint()
                        .map_or(false, |name| name.contains(constraint_hint))
            }
            _ => false,
        };

        if violated {
            LedgerError::not_found(entity, id)
        } else {
            self
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::TransactionFailed(err)
    }
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
