//! SQLCipher connection pool
//!
//! r2d2 pool over encrypted SQLite files. Every pooled connection gets the
//! key and connection pragmas applied in the manager's init hook.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::cipher::{configure_sqlcipher, looks_like_wrong_key, verify_encryption, SqlCipherConfig};
use super::config::SqlCipherPoolConfig;
use super::connection::SqlCipherConnection;
use super::pragmas::apply_connection_pragmas;
use crate::security::SecureString;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::metrics::StorageMetrics;
use crate::storage::types::{HealthStatus, PoolMetrics};

/// SQLCipher connection pool
#[derive(Debug)]
pub struct SqlCipherPool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlCipherPoolConfig,
    metrics: Arc<StorageMetrics>,
}

impl SqlCipherPool {
    /// Open (or create) the encrypted database at `path`.
    ///
    /// # Errors
    /// - `WrongKeyOrNotEncrypted` if the key does not open an existing file
    /// - `Connection` if the pool cannot be built
    #[instrument(skip(encryption_key), fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(
        path: &Path,
        encryption_key: SecureString,
        config: SqlCipherPoolConfig,
    ) -> StorageResult<Self> {
        info!("creating SQLCipher connection pool");

        let metrics = Arc::new(StorageMetrics::new(config.max_size));
        let cipher_config = SqlCipherConfig::new(encryption_key);
        let pool_config = config.clone();

        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            configure_sqlcipher(conn, &cipher_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            apply_connection_pragmas(conn, &pool_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| classify_open_error("Failed to create pool", &e.to_string()))?;

        {
            let conn = pool
                .get()
                .map_err(|e| classify_open_error("Failed to get test connection", &e.to_string()))?;
            verify_encryption(&conn)?;
            debug!("encryption verified");
        }

        info!(max_size = config.max_size, "SQLCipher pool ready");
        Ok(Self { pool, config, metrics })
    }

    /// Acquire a connection, recording acquisition metrics.
    #[instrument(level = "trace", skip(self), fields(pool_size = self.config.max_size))]
    pub fn get_sqlcipher_connection(&self) -> StorageResult<SqlCipherConnection> {
        let start = std::time::Instant::now();

        match self.pool.get() {
            Ok(conn) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                self.metrics.record_connection_acquired(duration_ms);
                Ok(SqlCipherConnection::new(conn))
            }
            Err(e) => {
                let err_str = e.to_string().to_lowercase();
                if err_str.contains("timeout") || err_str.contains("timed out") {
                    self.metrics.record_connection_timeout();
                    warn!(timeout = ?self.config.connection_timeout, "connection acquisition timed out");
                    Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    self.metrics.record_connection_error();
                    warn!(error = %e, "connection error");
                    Err(StorageError::Connection(format!("Failed to get connection: {e}")))
                }
            }
        }
    }

    /// Report pool state; never fails, an unusable pool is reported unhealthy.
    pub fn health_check(&self) -> HealthStatus {
        let state = self.pool.state();
        match self.pool.get() {
            Ok(_conn) => HealthStatus::healthy(
                state.connections as usize,
                state.idle_connections as usize,
                self.config.max_size as usize,
            ),
            Err(e) => HealthStatus::unhealthy(format!("Pool unhealthy: {e}")),
        }
    }

    /// Snapshot of acquisition counters
    pub fn pool_metrics(&self) -> PoolMetrics {
        PoolMetrics {
            connections_acquired: self.metrics.connections_acquired.load(Ordering::Relaxed),
            connections_timeout: self.metrics.connections_timeout.load(Ordering::Relaxed),
            connections_error: self.metrics.connections_error.load(Ordering::Relaxed),
            avg_acquisition_time_ms: self.metrics.avg_connection_time_ms(),
        }
    }

    pub fn max_size(&self) -> u32 {
        self.config.max_size
    }
}

fn classify_open_error(context: &str, message: &str) -> StorageError {
    warn!(error = %message, "{context}");
    if looks_like_wrong_key(message) {
        StorageError::WrongKeyOrNotEncrypted
    } else {
        StorageError::Connection(format!("{context}: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn test_key() -> SecureString {
        SecureString::new("test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")
    }

    #[test]
    fn test_pool_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = SqlCipherPool::new(&db_path, test_key(), SqlCipherPoolConfig::default()).unwrap();
        let conn = pool.get_sqlcipher_connection().unwrap();
        conn.execute("CREATE TABLE test (id INTEGER PRIMARY KEY)", &[]).unwrap();

        assert_eq!(pool.pool_metrics().connections_acquired, 1);
    }

    #[test]
    fn test_concurrent_connections() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = Arc::new(
            SqlCipherPool::new(&db_path, test_key(), SqlCipherPoolConfig::default()).unwrap(),
        );

        {
            let conn = pool.get_sqlcipher_connection().unwrap();
            conn.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, value TEXT)", &[]).unwrap();
        }

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    let conn = pool.get_sqlcipher_connection().unwrap();
                    let value = format!("thread_{i}");
                    conn.execute("INSERT INTO test (value) VALUES (?1)", &[&value]).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let conn = pool.get_sqlcipher_connection().unwrap();
        let count: i32 =
            conn.query_row("SELECT COUNT(*) FROM test", &[], |row| row.get(0)).unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_health_check() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = SqlCipherPool::new(&db_path, test_key(), SqlCipherPoolConfig::default()).unwrap();
        let health = pool.health_check();
        assert!(health.healthy);
        assert_eq!(health.max_connections, 8);
    }

    #[test]
    fn test_wrong_encryption_key() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        {
            let pool =
                SqlCipherPool::new(&db_path, test_key(), SqlCipherPoolConfig::default()).unwrap();
            let conn = pool.get_sqlcipher_connection().unwrap();
            conn.execute("CREATE TABLE test (id INTEGER)", &[]).unwrap();
        }

        let result = SqlCipherPool::new(
            &db_path,
            SecureString::new("wrong_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            SqlCipherPoolConfig::default(),
        );

        assert!(matches!(result, Err(StorageError::WrongKeyOrNotEncrypted)));
    }
}
