//! Storage error types

use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(String),

    #[error("Database encryption error: {0}")]
    Encryption(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Wrong encryption key or database not encrypted")]
    WrongKeyOrNotEncrypted,

    #[error("Connection timeout after {0}s")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Common(#[from] crate::CommonError),

    #[error(transparent)]
    Rusqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    R2d2(#[from] r2d2::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

impl ErrorClassification for StorageError {
    /// Timeouts, dropped connections and SQLite BUSY/LOCKED are transient.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Rusqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
            ),
            Self::Common(common_err) => common_err.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Timeout(_) => ErrorSeverity::Warning,
            Self::Encryption(_) | Self::Migration(_) | Self::WrongKeyOrNotEncrypted => {
                ErrorSeverity::Critical
            }
            Self::Common(common_err) => common_err.severity(),
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Encryption(_) | Self::Migration(_) | Self::WrongKeyOrNotEncrypted)
            || matches!(self, Self::Common(err) if err.is_critical())
    }
}

impl StorageError {
    /// Add operation context to the error
    pub fn with_operation(self, operation: impl Into<String>) -> Self {
        Self::Common(crate::CommonError::Storage {
            message: self.to_string(),
            operation: Some(operation.into()),
        })
    }

    /// Whether the underlying SQLite error is "no rows returned"
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::Rusqlite(rusqlite::Error::QueryReturnedNoRows))
    }
}

/// Convert StorageError to CommonError for integration
impl From<StorageError> for crate::CommonError {
    fn from(err: StorageError) -> Self {
        if let StorageError::Common(common_err) = err {
            return common_err;
        }

        crate::CommonError::Storage { message: err.to_string(), operation: None }
    }
}
