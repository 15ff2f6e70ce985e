//! Error types for the database layer.

use canary_common::CanaryError;
use thiserror::Error;

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Database error types.
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite/sqlx error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while preparing the database file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value does not have the expected shape
    #[error("Invalid data: {message}")]
    InvalidData {
        /// What was wrong
        message: String,
    },
}

impl DbError {
    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}

impl From<DbError> for CanaryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Serialization(e) => Self::Serialization(e),
            DbError::Io(e) => Self::Io(e),
            other => Self::database_with_source("Database operation failed", other),
        }
    }
}
