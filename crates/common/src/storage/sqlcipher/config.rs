//! SQLCipher connection pool configuration

use std::time::Duration;

/// SQLCipher pool configuration
#[derive(Debug, Clone)]
pub struct SqlCipherPoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Busy timeout for SQLite operations
    pub busy_timeout: Duration,

    /// Enable WAL journal mode
    pub enable_wal: bool,

    /// Enable foreign key constraints
    pub enable_foreign_keys: bool,
}

impl SqlCipherPoolConfig {
    /// Default configuration with a specific pool size (minimum 1)
    pub fn with_max_size(max_size: u32) -> Self {
        Self { max_size: max_size.max(1), ..Self::default() }
    }
}

impl Default for SqlCipherPoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SqlCipherPoolConfig::default();

        assert_eq!(config.max_size, 8);
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.busy_timeout, Duration::from_millis(5000));
        assert!(config.enable_wal, "WAL mode should be enabled by default");
        assert!(config.enable_foreign_keys);
    }

    #[test]
    fn zero_pool_size_is_clamped() {
        assert_eq!(SqlCipherPoolConfig::with_max_size(0).max_size, 1);
        assert_eq!(SqlCipherPoolConfig::with_max_size(3).max_size, 3);
    }
}
