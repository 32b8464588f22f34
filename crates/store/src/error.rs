use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A unique or foreign-key constraint rejected the write.
    #[error("Constraint conflict: {0}")]
    Conflict(String),

    /// A value is out of range: rejected by a CHECK constraint, or read back
    /// from a column and not representable in the domain type.
    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    /// The store refused the operation (used by the in-memory store's fail points).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return StoreError::Conflict(db_err.message().to_string());
        }
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_check_violation()
        {
            return StoreError::InvalidValue(db_err.message().to_string());
        }
        StoreError::Database(err)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
