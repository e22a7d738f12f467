//! Profile change requests and support tickets

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pocket_core::{ChangeRequestRepository, SupportTicketRepository};
use pocket_domain::{
    ChangeRequest, PocketError, RequestStatus, Result as DomainResult, SupportTicket,
};
use rusqlite::{params, Row, ToSql};
use tokio::task;
use uuid::Uuid;

use super::codec::{from_millis, from_optional_millis, parse_code, parse_json, parse_uuid, to_millis};
use super::manager::DbManager;
use crate::errors::{map_join_error, map_storage_error};

const REQUEST_COLUMNS: &str =
    "id, username, field, requested_value, status, created_at, resolved_at, resolved_by";

const TICKET_COLUMNS: &str =
    "id, username, subject, message, status, replies, created_at, updated_at";

/// SQLCipher-backed implementation of `ChangeRequestRepository`
pub struct SqlCipherChangeRequestRepository {
    db: Arc<DbManager>,
}

impl SqlCipherChangeRequestRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChangeRequestRepository for SqlCipherChangeRequestRepository {
    async fn insert(&self, request: &ChangeRequest) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let request = request.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let id = request.id.to_string();
            let field = request.field.as_str();
            let status = request.status.as_str();
            let created_at = to_millis(request.created_at);
            let resolved_at = request.resolved_at.map(to_millis);
            let params: [&dyn ToSql; 8] = [
                &id,
                &request.username,
                &field,
                &request.requested_value,
                &status,
                &created_at,
                &resolved_at,
                &request.resolved_by,
            ];

            conn.execute(
                &format!(
                    "INSERT INTO change_requests ({REQUEST_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params.as_slice(),
            )
            .map_err(map_storage_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<ChangeRequest>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<ChangeRequest>> {
            let conn = db.get_connection()?;
            conn.query_optional(
                &format!("SELECT {REQUEST_COLUMNS} FROM change_requests WHERE id = ?1"),
                params![id.to_string()],
                map_request_row,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list(&self, status: Option<RequestStatus>) -> DomainResult<Vec<ChangeRequest>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<ChangeRequest>> {
            let conn = db.get_connection()?;
            let rows = match status {
                Some(status) => conn.query_map(
                    &format!(
                        "SELECT {REQUEST_COLUMNS} FROM change_requests WHERE status = ?1
                         ORDER BY created_at ASC, id ASC"
                    ),
                    params![status.as_str()],
                    map_request_row,
                ),
                None => conn.query_map(
                    &format!(
                        "SELECT {REQUEST_COLUMNS} FROM change_requests
                         ORDER BY created_at ASC, id ASC"
                    ),
                    params![],
                    map_request_row,
                ),
            };
            rows.map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_for_user(&self, username: &str) -> DomainResult<Vec<ChangeRequest>> {
        let db = Arc::clone(&self.db);
        let username = username.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<ChangeRequest>> {
            let conn = db.get_connection()?;
            conn.query_map(
                &format!(
                    "SELECT {REQUEST_COLUMNS} FROM change_requests WHERE username = ?1
                     ORDER BY created_at ASC, id ASC"
                ),
                params![&username],
                map_request_row,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn resolve(
        &self,
        id: Uuid,
        status: RequestStatus,
        resolved_by: &str,
        resolved_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let resolved_by = resolved_by.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE change_requests
                     SET status = ?1, resolved_by = ?2, resolved_at = ?3
                     WHERE id = ?4 AND status = ?5",
                    params![
                        status.as_str(),
                        &resolved_by,
                        to_millis(resolved_at),
                        id.to_string(),
                        RequestStatus::Pending.as_str()
                    ],
                )
                .map_err(map_storage_error)?;
            Ok(updated > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_for_user(&self, username: &str) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);
        let username = username.to_string();

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute("DELETE FROM change_requests WHERE username = ?1", params![&username])
                .map_err(map_storage_error)?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_join_error)?
    }
}

/// SQLCipher-backed implementation of `SupportTicketRepository`
///
/// Replies are stored as a JSON array alongside the ticket.
pub struct SqlCipherSupportTicketRepository {
    db: Arc<DbManager>,
}

impl SqlCipherSupportTicketRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SupportTicketRepository for SqlCipherSupportTicketRepository {
    async fn insert(&self, ticket: &SupportTicket) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let ticket = ticket.clone();
        let replies = serde_json::to_string(&ticket.replies)?;

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let id = ticket.id.to_string();
            let status = ticket.status.as_str();
            let created_at = to_millis(ticket.created_at);
            let updated_at = to_millis(ticket.updated_at);
            let params: [&dyn ToSql; 8] = [
                &id,
                &ticket.username,
                &ticket.subject,
                &ticket.message,
                &status,
                &replies,
                &created_at,
                &updated_at,
            ];

            conn.execute(
                &format!(
                    "INSERT INTO support_tickets ({TICKET_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params.as_slice(),
            )
            .map_err(map_storage_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<SupportTicket>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<SupportTicket>> {
            let conn = db.get_connection()?;
            conn.query_optional(
                &format!("SELECT {TICKET_COLUMNS} FROM support_tickets WHERE id = ?1"),
                params![id.to_string()],
                map_ticket_row,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update(&self, ticket: &SupportTicket) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let id = ticket.id;
        let status = ticket.status;
        let updated_at = ticket.updated_at;
        let replies = serde_json::to_string(&ticket.replies)?;

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE support_tickets SET status = ?1, replies = ?2, updated_at = ?3
                     WHERE id = ?4",
                    params![status.as_str(), &replies, to_millis(updated_at), id.to_string()],
                )
                .map_err(map_storage_error)?;
            if updated == 0 {
                return Err(PocketError::NotFound(format!("support ticket {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_for_user(&self, username: &str) -> DomainResult<Vec<SupportTicket>> {
        let db = Arc::clone(&self.db);
        let username = username.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<SupportTicket>> {
            let conn = db.get_connection()?;
            conn.query_map(
                &format!(
                    "SELECT {TICKET_COLUMNS} FROM support_tickets WHERE username = ?1
                     ORDER BY created_at DESC, id DESC"
                ),
                params![&username],
                map_ticket_row,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_all(&self) -> DomainResult<Vec<SupportTicket>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<SupportTicket>> {
            let conn = db.get_connection()?;
            conn.query_map(
                &format!(
                    "SELECT {TICKET_COLUMNS} FROM support_tickets ORDER BY created_at DESC, id DESC"
                ),
                params![],
                map_ticket_row,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_for_user(&self, username: &str) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);
        let username = username.to_string();

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute("DELETE FROM support_tickets WHERE username = ?1", params![&username])
                .map_err(map_storage_error)?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_join_error)?
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn map_request_row(row: &Row<'_>) -> rusqlite::Result<ChangeRequest> {
    let id: String = row.get(0)?;
    let field: String = row.get(2)?;
    let status: String = row.get(4)?;

    Ok(ChangeRequest {
        id: parse_uuid(0, &id)?,
        username: row.get(1)?,
        field: parse_code(2, &field)?,
        requested_value: row.get(3)?,
        status: parse_code(4, &status)?,
        created_at: from_millis(5, row.get(5)?)?,
        resolved_at: from_optional_millis(6, row.get(6)?)?,
        resolved_by: row.get(7)?,
    })
}

fn map_ticket_row(row: &Row<'_>) -> rusqlite::Result<SupportTicket> {
    let id: String = row.get(0)?;
    let status: String = row.get(4)?;
    let replies: String = row.get(5)?;

    Ok(SupportTicket {
        id: parse_uuid(0, &id)?,
        username: row.get(1)?,
        subject: row.get(2)?,
        message: row.get(3)?,
        status: parse_code(4, &status)?,
        replies: parse_json(5, &replies)?,
        created_at: from_millis(6, row.get(6)?)?,
        updated_at: from_millis(7, row.get(7)?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use pocket_domain::{ProfileField, TicketReply, TicketStatus};
    use tempfile::TempDir;

    use super::*;

    const TEST_KEY: &str = "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn setup() -> (TempDir, Arc<DbManager>) {
        let temp_dir = TempDir::new().unwrap();
        let manager =
            DbManager::new(temp_dir.path().join("support.db"), 2, Some(TEST_KEY)).expect("manager");
        manager.run_migrations().unwrap();
        (temp_dir, Arc::new(manager))
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resolve_only_moves_pending_requests() {
        let (_dir, db) = setup();
        let repo = SqlCipherChangeRequestRepository::new(db);

        let first = ChangeRequest::new("alice", ProfileField::Email, "alice@uni.edu", base());
        let second =
            ChangeRequest::new("alice", ProfileField::Phone, "555-0100", base() + Duration::hours(1));
        repo.insert(&first).await.unwrap();
        repo.insert(&second).await.unwrap();

        assert!(repo.resolve(first.id, RequestStatus::Approved, "admin", base()).await.unwrap());
        assert!(!repo.resolve(first.id, RequestStatus::Rejected, "admin", base()).await.unwrap());
        assert!(!repo.resolve(Uuid::now_v7(), RequestStatus::Rejected, "admin", base()).await.unwrap());

        let stored = repo.get(first.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Approved);
        assert_eq!(stored.resolved_by.as_deref(), Some("admin"));
        assert_eq!(stored.resolved_at, Some(base()));

        let pending = repo.list(Some(RequestStatus::Pending)).await.unwrap();
        assert_eq!(pending, vec![second.clone()]);
        let all = repo.list(None).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![first.id, second.id]);

        assert_eq!(repo.list_for_user("alice").await.unwrap().len(), 2);
        assert_eq!(repo.delete_for_user("alice").await.unwrap(), 2);
        assert!(repo.list(None).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tickets_keep_replies_and_sort_newest_first() {
        let (_dir, db) = setup();
        let repo = SqlCipherSupportTicketRepository::new(db);

        let older = SupportTicket::new("alice", "Vault", "Cannot unlock", base());
        let newer = SupportTicket::new("bob", "Grades", "Missing grade", base() + Duration::hours(2));
        repo.insert(&older).await.unwrap();
        repo.insert(&newer).await.unwrap();

        let mut updated = older.clone();
        updated.replies.push(TicketReply {
            author: "admin".into(),
            message: "Try the system key".into(),
            timestamp: base() + Duration::hours(3),
        });
        updated.status = TicketStatus::Resolved;
        updated.updated_at = base() + Duration::hours(3);
        repo.update(&updated).await.unwrap();

        assert_eq!(repo.get(older.id).await.unwrap(), Some(updated));
        let all = repo.list_all().await.unwrap();
        assert_eq!(all.iter().map(|t| t.id).collect::<Vec<_>>(), vec![newer.id, older.id]);
        assert_eq!(repo.list_for_user("bob").await.unwrap(), vec![newer.clone()]);

        let ghost = SupportTicket::new("carol", "?", "?", base());
        assert!(matches!(repo.update(&ghost).await, Err(PocketError::NotFound(_))));

        assert_eq!(repo.delete_for_user("bob").await.unwrap(), 1);
        assert!(repo.get(newer.id).await.unwrap().is_none());
    }
}
