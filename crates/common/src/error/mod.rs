//! Common error types shared by the StudentPocket infrastructure crates.
//!
//! Module-specific errors compose with [`CommonError`] instead of duplicating
//! its variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum VaultError {
//!     #[error("vault quota exceeded")]
//!     QuotaExceeded,
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```
//!
//! Every error type that crosses a crate boundary implements
//! [`ErrorClassification`] so callers can decide on retries and log levels
//! without matching on concrete variants.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result alias for operations returning [`CommonError`].
pub type CommonResult<T> = Result<T, CommonError>;

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Standard interface for classifying errors by their characteristics.
pub trait ErrorClassification {
    /// Check if this error is retryable (lock contention, busy database).
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Common error patterns that appear across multiple modules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommonError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String, field: Option<String> },

    /// Lock acquisition or concurrency errors
    #[error("Lock error: {message}")]
    Lock { message: String, resource: Option<String> },

    /// Serialization or deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String, format: Option<String> },

    /// Validation errors
    #[error("Validation error for field '{field}': {message}")]
    Validation { field: String, message: String },

    /// Resource not found errors
    #[error("{resource_type} not found")]
    NotFound { resource_type: String, identifier: Option<String> },

    /// Permission or authorization errors
    #[error("Unauthorized to perform '{operation}'")]
    Unauthorized { operation: String },

    /// Storage/database errors
    #[error("Storage error: {message}")]
    Storage { message: String, operation: Option<String> },

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {message}")]
    Internal { message: String, context: Option<String> },
}

impl CommonError {
    /// Create a simple configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Create a simple lock error
    pub fn lock<S: Into<String>>(message: S) -> Self {
        Self::Lock { message: message.into(), resource: None }
    }

    /// Create a validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create a not-found error for a resource type and identifier
    pub fn not_found<T: Into<String>, I: Into<String>>(resource_type: T, identifier: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), identifier: Some(identifier.into()) }
    }

    /// Create a simple internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), context: None }
    }

    /// Create an internal error with context
    pub fn internal_with_context<S: Into<String>, C: Into<String>>(message: S, context: C) -> Self {
        Self::Internal { message: message.into(), context: Some(context.into()) }
    }
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Lock { .. } | Self::Storage { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation { .. } | Self::NotFound { .. } => ErrorSeverity::Info,
            Self::Lock { .. } | Self::Unauthorized { .. } => ErrorSeverity::Warning,
            Self::Config { .. } | Self::Serialization { .. } | Self::Storage { .. } => {
                ErrorSeverity::Error
            }
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization { message: err.to_string(), format: Some("json".to_string()) }
    }
}
