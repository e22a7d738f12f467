//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for StudentPocket
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum PocketError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// Wrong username or password. `attempts` is the running failed-login count.
    #[error("Invalid credentials ({attempts} failed attempts)")]
    InvalidCredentials { attempts: u32 },

    #[error("Account locked: {0}")]
    AccountLocked(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Optimistic version check failed.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for PocketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for StudentPocket operations
pub type Result<T> = std::result::Result<T, PocketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let err = PocketError::NotFound("user:alice:profile".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "NotFound");
        assert_eq!(json["message"], "user:alice:profile");
    }

    #[test]
    fn invalid_credentials_reports_attempts() {
        let err = PocketError::InvalidCredentials { attempts: 2 };
        assert_eq!(err.to_string(), "Invalid credentials (2 failed attempts)");
    }

    #[test]
    fn json_errors_become_serialization() {
        let err: PocketError = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert!(matches!(err, PocketError::Serialization(_)));
    }
}
