use thiserror::Error;

/// Errors that can occur when interacting with the inventory ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The statement, lock wait or transaction exceeded its time bound.
    /// The transaction has been rolled back and the call may be retried.
    #[error("Ledger operation timed out: {0}")]
    Timeout(String),

    /// The database aborted the transaction to break a deadlock or a
    /// serialization conflict. Nothing was written and the call may be retried.
    #[error("Transaction aborted by lock contention: {0}")]
    Contention(String),

    /// The backend is not reachable (pool closed, injected failure, ...).
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A row with the same unique key already exists.
    #[error("Duplicate row: {0}")]
    Duplicate(String),

    /// A stored value could not be decoded into a record.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl LedgerError {
    /// Returns true when the failure is transient and the whole operation
    /// can be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::Timeout(_) | LedgerError::Contention(_) | LedgerError::Unavailable(_)
        )
    }
}

/// SQLSTATE codes with a dedicated [`LedgerError`] variant.
const QUERY_CANCELED: &str = "57014";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const DEADLOCK_DETECTED: &str = "40P01";
const SERIALIZATION_FAILURE: &str = "40001";
const UNIQUE_VIOLATION: &str = "23505";

/// Maps a PostgreSQL SQLSTATE to its variant. `detail` is the constraint
/// name when there is one, else the server message.
fn classify_sqlstate(code: &str, detail: String) -> Option<LedgerError> {
    match code {
        QUERY_CANCELED | LOCK_NOT_AVAILABLE => Some(LedgerError::Timeout(detail)),
        DEADLOCK_DETECTED | SERIALIZATION_FAILURE => Some(LedgerError::Contention(detail)),
        UNIQUE_VIOLATION => Some(LedgerError::Duplicate(detail)),
        _ => None,
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && let Some(code) = db_err.code()
        {
            let detail = match code.as_ref() {
                UNIQUE_VIOLATION => db_err
                    .constraint()
                    .map(str::to_string)
                    .unwrap_or_else(|| db_err.message().to_string()),
                _ => db_err.message().to_string(),
            };
            if let Some(classified) = classify_sqlstate(&code, detail) {
                return classified;
            }
        }

        match err {
            sqlx::Error::PoolTimedOut => LedgerError::Timeout(err.to_string()),
            sqlx::Error::PoolClosed => LedgerError::Unavailable(err.to_string()),
            other => LedgerError::Database(other),
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_retryable() {
        let err = LedgerError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, LedgerError::Timeout(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn lock_conflicts_are_retryable() {
        for code in [QUERY_CANCELED, LOCK_NOT_AVAILABLE] {
            let err = classify_sqlstate(code, "canceled".to_string()).unwrap();
            assert!(matches!(err, LedgerError::Timeout(_)));
            assert!(err.is_retryable());
        }
        for code in [DEADLOCK_DETECTED, SERIALIZATION_FAILURE] {
            let err = classify_sqlstate(code, "deadlock detected".to_string()).unwrap();
            assert!(matches!(err, LedgerError::Contention(_)));
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn other_sqlstates_are_not_classified() {
        let duplicate = classify_sqlstate(UNIQUE_VIOLATION, "unique_store_owner".to_string());
        assert!(matches!(duplicate, Some(LedgerError::Duplicate(ref c)) if c == "unique_store_owner"));
        assert!(!duplicate.unwrap().is_retryable());

        // Foreign key violation.
        assert!(classify_sqlstate("23503", "fk".to_string()).is_none());
    }

    #[test]
    fn row_not_found_is_a_plain_database_error() {
        let err = LedgerError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, LedgerError::Database(_)));
        assert!(!err.is_retryable());
    }
}
