//! Append-only activity log on SQLCipher

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pocket_core::ActivityLogRepository;
use pocket_domain::{ActivityAction, ActivityLog, Result as DomainResult};
use rusqlite::{params, Row, ToSql};
use tokio::task;
use tracing::{debug, instrument};

use super::codec::{from_millis, parse_json, parse_uuid, to_millis, usize_to_i64};
use super::manager::DbManager;
use crate::errors::{map_join_error, map_storage_error};

const LOG_COLUMNS: &str = "id, timestamp, actor, target_user, action, description, metadata";

/// SQLCipher-backed implementation of `ActivityLogRepository`
pub struct SqlCipherActivityLogRepository {
    db: Arc<DbManager>,
}

impl SqlCipherActivityLogRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivityLogRepository for SqlCipherActivityLogRepository {
    async fn append(&self, entry: ActivityLog) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let metadata = entry.metadata.as_ref().map(serde_json::to_string).transpose()?;

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let id = entry.id.to_string();
            let action = entry.action.as_str();
            let timestamp = to_millis(entry.timestamp);
            let params: [&dyn ToSql; 7] = [
                &id,
                &timestamp,
                &entry.actor,
                &entry.target_user,
                &action,
                &entry.description,
                &metadata,
            ];

            conn.execute(
                &format!("INSERT INTO activity_logs ({LOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                params.as_slice(),
            )
            .map_err(map_storage_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn recent(&self, limit: usize) -> DomainResult<Vec<ActivityLog>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<ActivityLog>> {
            let conn = db.get_connection()?;
            conn.query_map(
                &format!(
                    "SELECT {LOG_COLUMNS} FROM activity_logs
                     ORDER BY timestamp DESC, id DESC LIMIT ?1"
                ),
                params![usize_to_i64(limit)],
                map_log_row,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn for_user(&self, username: &str, limit: usize) -> DomainResult<Vec<ActivityLog>> {
        let db = Arc::clone(&self.db);
        let username = username.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<ActivityLog>> {
            let conn = db.get_connection()?;
            conn.query_map(
                &format!(
                    "SELECT {LOG_COLUMNS} FROM activity_logs WHERE target_user = ?1
                     ORDER BY timestamp DESC, id DESC LIMIT ?2"
                ),
                params![&username, usize_to_i64(limit)],
                map_log_row,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ActivityLog>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<ActivityLog>> {
            let conn = db.get_connection()?;
            conn.query_map(
                &format!(
                    "SELECT {LOG_COLUMNS} FROM activity_logs
                     WHERE timestamp >= ?1 AND timestamp < ?2
                     ORDER BY timestamp ASC, id ASC"
                ),
                params![to_millis(start), to_millis(end)],
                map_log_row,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute("DELETE FROM activity_logs WHERE timestamp < ?1", params![to_millis(cutoff)])
                .map_err(map_storage_error)?;
            debug!(removed, "purged activity log entries");
            Ok(removed as u64)
        })
        .await
        .map_err(map_join_error)?
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn map_log_row(row: &Row<'_>) -> rusqlite::Result<ActivityLog> {
    let id: String = row.get(0)?;
    let action: String = row.get(4)?;
    let metadata: Option<String> = row.get(6)?;

    Ok(ActivityLog {
        id: parse_uuid(0, &id)?,
        timestamp: from_millis(1, row.get(1)?)?,
        actor: row.get(2)?,
        target_user: row.get(3)?,
        action: ActivityAction::from(action),
        description: row.get(5)?,
        metadata: metadata.map(|raw| parse_json(6, &raw)).transpose()?,
    })
}
