//! Versioned JSON key-value store on SQLCipher
//!
//! Each port call is one statement, so every call is atomic on its own.
//! Optimistic concurrency is a `version` column checked in the `WHERE`
//! clause of the update.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pocket_core::{KeyValueStore, VersionedValue};
use pocket_domain::{PocketError, Result as DomainResult};
use rusqlite::{params, Row};
use serde_json::Value;
use tokio::task;
use tracing::{debug, instrument};

use super::codec::{from_millis, parse_json, to_millis};
use super::manager::DbManager;
use crate::errors::{map_join_error, map_storage_error};

const SELECT_ENTRY: &str = "SELECT value, version, updated_at FROM kv_store WHERE key = ?1";

const UPSERT_ENTRY: &str = "INSERT INTO kv_store (key, value, version, updated_at)
     VALUES (?1, ?2, 1, ?3)
     ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        version = kv_store.version + 1,
        updated_at = excluded.updated_at
     RETURNING version";

const INSERT_IF_ABSENT: &str = "INSERT INTO kv_store (key, value, version, updated_at)
     VALUES (?1, ?2, 1, ?3)
     ON CONFLICT(key) DO NOTHING";

const UPDATE_IF_VERSION: &str = "UPDATE kv_store
     SET value = ?2, version = version + 1, updated_at = ?3
     WHERE key = ?1 AND version = ?4";

const DELETE_PREFIX: &str = "DELETE FROM kv_store WHERE substr(key, 1, length(?1)) = ?1";

const SELECT_KEYS_WITH_PREFIX: &str =
    "SELECT key FROM kv_store WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key";

/// SQLCipher-backed implementation of `KeyValueStore`
pub struct SqlCipherKeyValueStore {
    db: Arc<DbManager>,
}

impl SqlCipherKeyValueStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqlCipherKeyValueStore {
    async fn get(&self, key: &str) -> DomainResult<Option<Value>> {
        Ok(self.get_versioned(key).await?.map(|entry| entry.value))
    }

    async fn get_versioned(&self, key: &str) -> DomainResult<Option<VersionedValue>> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<VersionedValue>> {
            let conn = db.get_connection()?;
            conn.query_optional(SELECT_ENTRY, params![&key], map_entry_row)
                .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: Value) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();
        let encoded = serde_json::to_string(&value)?;

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let version: i64 = conn
                .query_row(
                    UPSERT_ENTRY,
                    params![&key, &encoded, to_millis(Utc::now())],
                    |row| row.get(0),
                )
                .map_err(map_storage_error)?;
            Ok(version_from_db(version))
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, value))]
    async fn compare_and_set(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: Value,
    ) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();
        let encoded = serde_json::to_string(&value)?;

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let now = to_millis(Utc::now());

            let (changed, new_version) = match expected_version {
                None => {
                    let changed = conn
                        .execute(INSERT_IF_ABSENT, params![&key, &encoded, now])
                        .map_err(map_storage_error)?;
                    (changed, 1)
                }
                Some(expected) => {
                    let expected_db = i64::try_from(expected).map_err(|_| {
                        PocketError::InvalidInput(format!("version {expected} out of range"))
                    })?;
                    let changed = conn
                        .execute(UPDATE_IF_VERSION, params![&key, &encoded, now, expected_db])
                        .map_err(map_storage_error)?;
                    (changed, expected.saturating_add(1))
                }
            };

            if changed == 0 {
                debug!(key = %key, ?expected_version, "compare-and-set lost the race");
                return Err(PocketError::Conflict(format!(
                    "{key}: stored version no longer matches {expected_version:?}"
                )));
            }
            Ok(new_version)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, key: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute("DELETE FROM kv_store WHERE key = ?1", params![&key])
                .map_err(map_storage_error)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn delete_prefix(&self, prefix: &str) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);
        let prefix = prefix.to_string();

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let removed = conn.execute(DELETE_PREFIX, params![&prefix]).map_err(map_storage_error)?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn keys_with_prefix(&self, prefix: &str) -> DomainResult<Vec<String>> {
        let db = Arc::clone(&self.db);
        let prefix = prefix.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<String>> {
            let conn = db.get_connection()?;
            conn.query_map(SELECT_KEYS_WITH_PREFIX, params![&prefix], |row| row.get(0))
                .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<VersionedValue> {
    let raw: String = row.get(0)?;
    let version: i64 = row.get(1)?;
    Ok(VersionedValue {
        value: parse_json(0, &raw)?,
        version: version_from_db(version),
        updated_at: from_millis(2, row.get(2)?)?,
    })
}

fn version_from_db(version: i64) -> u64 {
    u64::try_from(version).unwrap_or_default()
}
