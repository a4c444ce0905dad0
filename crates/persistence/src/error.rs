//! Storage error types.

use thiserror::Error;

/// Errors raised by the job store and the export data sources.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No connection could be acquired within the per-attempt timeout.
    #[error("Database connection timeout")]
    ConnectTimeout,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped to its domain type.
    #[error("Failed to decode stored row: {0}")]
    Decode(String),

    /// The caller asked for an operation the store refuses (e.g. an empty patch).
    #[error("Invalid storage request: {0}")]
    Validation(String),
}

impl StorageError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::ConnectTimeout | StorageError::Unavailable(_) => true,
            StorageError::Database(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            StorageError::Decode(_) | StorageError::Validation(_) => false,
        }
    }

    /// Maps connection acquisition failures to the storage taxonomy.
    pub fn from_acquire(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StorageError::ConnectTimeout,
            sqlx::Error::PoolClosed => StorageError::Unavailable("connection pool closed".into()),
            other => StorageError::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::ConnectTimeout.is_transient());
        assert!(StorageError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!StorageError::Decode("bad status".into()).is_transient());
        assert!(!StorageError::Validation("empty".into()).is_transient());
    }

    #[test]
    fn test_from_acquire() {
        assert!(matches!(
            StorageError::from_acquire(sqlx::Error::PoolTimedOut),
            StorageError::ConnectTimeout
        ));
        assert!(matches!(
            StorageError::from_acquire(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
        assert!(matches!(
            StorageError::from_acquire(sqlx::Error::RowNotFound),
            StorageError::Database(_)
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            StorageError::ConnectTimeout.to_string(),
            "Database connection timeout"
        );
    }
}
