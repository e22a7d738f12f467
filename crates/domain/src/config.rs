//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_KEY_ACTIVE_SECS, DEFAULT_KEY_COOLDOWN_SECS, DEFAULT_MAX_FAILED_LOGINS,
    DEFAULT_MAX_VIOLATIONS, DEFAULT_SESSION_TTL_SECS, DEFAULT_STORAGE_LIMIT_BYTES,
    DEFAULT_UPDATE_RETRIES, MAX_KEY_PHASE_SECS, MAX_SESSION_TTL_SECS,
};
use crate::errors::{PocketError, Result};
use crate::types::Role;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub key_rotation: KeyRotationConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub seed_accounts: Vec<SeedAccount>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
    /// SQLCipher key. When absent the keyring-managed key is used.
    #[serde(skip_serializing)]
    pub encryption_key: Option<String>,
}

/// Violation and login policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Threshold copied into new profiles
    pub max_violations: u32,
    pub max_failed_logins: u32,
    /// Compare-and-set attempts before a write gives up with `Conflict`
    pub update_retries: u32,
}

/// System key phase durations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyRotationConfig {
    pub active_secs: u64,
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_secs: u64,
}

/// Per-user storage quota and audit retention
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub default_limit_bytes: u64,
    /// Activity log entries older than this are purged at startup
    pub activity_retention_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `pocket_core=debug`
    pub level: String,
    pub json: bool,
    /// Directory for daily rolling log files; stdout only when absent
    pub file_dir: Option<String>,
    pub file_prefix: String,
}

/// Account created at startup when missing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAccount {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "student_pocket.db".to_string(), pool_size: 8, encryption_key: None }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_violations: DEFAULT_MAX_VIOLATIONS,
            max_failed_logins: DEFAULT_MAX_FAILED_LOGINS,
            update_retries: DEFAULT_UPDATE_RETRIES,
        }
    }
}

impl Default for KeyRotationConfig {
    fn default() -> Self {
        Self { active_secs: DEFAULT_KEY_ACTIVE_SECS, cooldown_secs: DEFAULT_KEY_COOLDOWN_SECS }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_secs: DEFAULT_SESSION_TTL_SECS }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { default_limit_bytes: DEFAULT_STORAGE_LIMIT_BYTES, activity_retention_days: None }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_dir: None,
            file_prefix: "student_pocket".to_string(),
        }
    }
}

impl Config {
    /// Reject configurations the services cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(PocketError::Config("database.path must not be empty".into()));
        }
        if self.database.pool_size == 0 {
            return Err(PocketError::Config("database.pool_size must be at least 1".into()));
        }
        if self.security.max_violations == 0 {
            return Err(PocketError::Config("security.max_violations must be at least 1".into()));
        }
        if self.security.max_failed_logins == 0 {
            return Err(PocketError::Config(
                "security.max_failed_logins must be at least 1".into(),
            ));
        }
        if self.security.update_retries == 0 {
            return Err(PocketError::Config("security.update_retries must be at least 1".into()));
        }
        if self.key_rotation.active_secs == 0 || self.key_rotation.cooldown_secs == 0 {
            return Err(PocketError::Config("key_rotation durations must be positive".into()));
        }
        if self.key_rotation.active_secs > MAX_KEY_PHASE_SECS
            || self.key_rotation.cooldown_secs > MAX_KEY_PHASE_SECS
        {
            return Err(PocketError::Config(format!(
                "key_rotation durations must not exceed {MAX_KEY_PHASE_SECS} seconds"
            )));
        }
        if self.session.ttl_secs == 0 {
            return Err(PocketError::Config("session.ttl_secs must be positive".into()));
        }
        if self.session.ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(PocketError::Config(format!(
                "session.ttl_secs must not exceed {MAX_SESSION_TTL_SECS}"
            )));
        }
        if let Some(seed) = self.seed_accounts.iter().find(|s| s.username.trim().is_empty()) {
            return Err(PocketError::Config(format!(
                "seed account for '{}' has an empty username",
                seed.email
            )));
        }
        Ok(())
    }
}
