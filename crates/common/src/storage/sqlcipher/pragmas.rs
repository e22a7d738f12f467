//! Per-connection SQLite pragmas.

use rusqlite::Connection;

use super::config::SqlCipherPoolConfig;
use crate::storage::error::{StorageError, StorageResult};

/// Apply connection-level pragmas: WAL journal, NORMAL sync, foreign keys
/// and the busy timeout.
pub fn apply_connection_pragmas(
    conn: &Connection,
    config: &SqlCipherPoolConfig,
) -> StorageResult<()> {
    let mut pragma_sql = String::new();

    if config.enable_wal {
        pragma_sql.push_str("PRAGMA journal_mode=WAL;\n");
        pragma_sql.push_str("PRAGMA wal_autocheckpoint=1000;\n");
    }

    pragma_sql.push_str("PRAGMA synchronous=NORMAL;\n");

    if config.enable_foreign_keys {
        pragma_sql.push_str("PRAGMA foreign_keys=ON;\n");
    }

    conn.execute_batch(&pragma_sql)
        .map_err(|e| StorageError::Query(format!("Failed to apply pragmas: {e}")))?;

    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| StorageError::Query(format!("Failed to set busy timeout: {e}")))?;

    Ok(())
}
