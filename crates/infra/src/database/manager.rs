//! Database connection manager backed by the shared SQLCipher pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pocket_common::storage::sqlcipher::{SqlCipherConnection, SqlCipherPoolConfig};
use pocket_common::storage::{HealthStatus, PoolMetrics};
use pocket_common::SecureString;
use pocket_domain::{PocketError, Result};
use rusqlite::params;
use tracing::{info, warn};

use super::codec::to_millis;
use super::sqlcipher_pool::{create_sqlcipher_pool, SqlCipherPool};
use crate::errors::map_storage_error;

/// Current schema revision recorded in `schema_version`
pub const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Database manager that wraps an [`SqlCipherPool`].
pub struct DbManager {
    pool: Arc<SqlCipherPool>,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size and SQLCipher key.
    pub fn new<P: AsRef<Path>>(
        db_path: P,
        pool_size: u32,
        encryption_key: Option<&str>,
    ) -> Result<Self> {
        let key = encryption_key
            .filter(|key| !key.is_empty())
            .map(SecureString::new)
            .ok_or_else(|| PocketError::Security("database encryption key not provided".into()))?;

        let path = db_path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PocketError::Database(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let config = SqlCipherPoolConfig::with_max_size(pool_size.max(1));
        let pool = create_sqlcipher_pool(&path, key, config)?;

        info!(
            db_path = %path.display(),
            max_connections = pool.max_size(),
            "sqlcipher pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Borrow the underlying SQLCipher pool.
    pub fn pool(&self) -> &Arc<SqlCipherPool> {
        &self.pool
    }

    /// Acquire a SQLCipher connection from the pool.
    pub fn get_connection(&self) -> Result<SqlCipherConnection> {
        self.pool.get_sqlcipher_connection().map_err(map_storage_error)
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn)?;

        let version = current_version(&conn)?;
        if version > SCHEMA_VERSION {
            warn!(found = version, supported = SCHEMA_VERSION, "database schema is newer than this build");
        }
        info!(schema_version = version, "database schema ready");
        Ok(())
    }

    /// Highest applied schema revision, 0 before migrations run.
    pub fn schema_version(&self) -> Result<i32> {
        let conn = self.get_connection()?;
        current_version(&conn)
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database answers a trivial query.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
            .map_err(map_storage_error)?;
        Ok(())
    }

    /// Pool-level health report (connection counts, last error)
    pub fn pool_health(&self) -> HealthStatus {
        self.pool.health_check()
    }

    pub fn pool_metrics(&self) -> PoolMetrics {
        self.pool.pool_metrics()
    }
}

fn create_schema(conn: &SqlCipherConnection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(|e| map_storage_error(e.into()))?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![SCHEMA_VERSION, to_millis(chrono::Utc::now())],
    )
    .map_err(map_storage_error)?;
    Ok(())
}

fn current_version(conn: &SqlCipherConnection) -> Result<i32> {
    let exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            params![],
            |row| row.get(0),
        )
        .map_err(map_storage_error)?;
    if exists == 0 {
        return Ok(0);
    }

    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", params![], |row| {
        row.get(0)
    })
    .map_err(map_storage_error)
}
