//! Login credentials (Argon2 hashes) and the device session

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pocket_core::{CredentialRepository, SessionRepository};
use pocket_domain::{CredentialRecord, PocketError, Result as DomainResult, Session};
use rusqlite::{params, Row, ToSql};
use tokio::task;
use tracing::debug;

use super::codec::{from_millis, parse_code, parse_uuid, to_millis};
use super::manager::DbManager;
use crate::errors::{is_unique_violation, map_join_error, map_storage_error};

const SELECT_CREDENTIAL: &str = "SELECT username, password_hash, role, created_at, password_changed_at
     FROM credentials WHERE username = ?1";

const INSERT_CREDENTIAL: &str = "INSERT INTO credentials
     (username, password_hash, role, created_at, password_changed_at)
     VALUES (?1, ?2, ?3, ?4, ?5)";

const SESSION_SLOT: i64 = 1;

/// SQLCipher-backed implementation of `CredentialRepository`
pub struct SqlCipherCredentialRepository {
    db: Arc<DbManager>,
}

impl SqlCipherCredentialRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialRepository for SqlCipherCredentialRepository {
    async fn get(&self, username: &str) -> DomainResult<Option<CredentialRecord>> {
        let db = Arc::clone(&self.db);
        let username = username.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<CredentialRecord>> {
            let conn = db.get_connection()?;
            conn.query_optional(SELECT_CREDENTIAL, params![&username], map_credential_row)
                .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert(&self, record: &CredentialRecord) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let record = record.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let role = record.role.as_str();
            let created_at = to_millis(record.created_at);
            let changed_at = to_millis(record.password_changed_at);
            let params: [&dyn ToSql; 5] =
                [&record.username, &record.password_hash, &role, &created_at, &changed_at];

            match conn.execute(INSERT_CREDENTIAL, params.as_slice()) {
                Ok(_) => Ok(()),
                Err(err) if is_unique_violation(&err) => Err(PocketError::Conflict(format!(
                    "username '{}' is already registered",
                    record.username
                ))),
                Err(err) => Err(map_storage_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let username = username.to_string();
        let password_hash = password_hash.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE credentials SET password_hash = ?1, password_changed_at = ?2
                     WHERE username = ?3",
                    params![&password_hash, to_millis(changed_at), &username],
                )
                .map_err(map_storage_error)?;
            Ok(updated > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, username: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let username = username.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute("DELETE FROM credentials WHERE username = ?1", params![&username])
                .map_err(map_storage_error)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_usernames(&self) -> DomainResult<Vec<String>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<String>> {
            let conn = db.get_connection()?;
            conn.query_map("SELECT username FROM credentials ORDER BY username", params![], |row| {
                row.get(0)
            })
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

/// SQLCipher-backed implementation of `SessionRepository`
///
/// The table holds at most one row (`id = 1`).
pub struct SqlCipherSessionRepository {
    db: Arc<DbManager>,
}

impl SqlCipherSessionRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionRepository for SqlCipherSessionRepository {
    async fn load(&self) -> DomainResult<Option<Session>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Session>> {
            let conn = db.get_connection()?;
            conn.query_optional(
                "SELECT token, username, created_at, expires_at FROM sessions WHERE id = ?1",
                params![SESSION_SLOT],
                map_session_row,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn store(&self, session: &Session) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let session = session.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT OR REPLACE INTO sessions (id, token, username, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    SESSION_SLOT,
                    session.token.to_string(),
                    &session.username,
                    to_millis(session.created_at),
                    to_millis(session.expires_at)
                ],
            )
            .map_err(map_storage_error)?;
            debug!(username = %session.username, "session stored");
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn clear(&self) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute("DELETE FROM sessions", params![]).map_err(map_storage_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn map_credential_row(row: &Row<'_>) -> rusqlite::Result<CredentialRecord> {
    let role: String = row.get(2)?;
    Ok(CredentialRecord {
        username: row.get(0)?,
        password_hash: row.get(1)?,
        role: parse_code(2, &role)?,
        created_at: from_millis(3, row.get(3)?)?,
        password_changed_at: from_millis(4, row.get(4)?)?,
    })
}

fn map_session_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let token: String = row.get(0)?;
    Ok(Session {
        token: parse_uuid(0, &token)?,
        username: row.get(1)?,
        created_at: from_millis(2, row.get(2)?)?,
        expires_at: from_millis(3, row.get(3)?)?,
    })
}
