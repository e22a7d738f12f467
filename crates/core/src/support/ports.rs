//! Port interfaces for change requests and support tickets

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pocket_domain::{ChangeRequest, RequestStatus, Result, SupportTicket};
use uuid::Uuid;

#[async_trait]
pub trait ChangeRequestRepository: Send + Sync {
    async fn insert(&self, request: &ChangeRequest) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<ChangeRequest>>;

    /// Oldest first; all statuses when `status` is `None`
    async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<ChangeRequest>>;

    async fn list_for_user(&self, username: &str) -> Result<Vec<ChangeRequest>>;

    /// Move a PENDING request to `status`. Returns false if it was not
    /// pending (or does not exist).
    async fn resolve(
        &self,
        id: Uuid,
        status: RequestStatus,
        resolved_by: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn delete_for_user(&self, username: &str) -> Result<u64>;
}

#[async_trait]
pub trait SupportTicketRepository: Send + Sync {
    async fn insert(&self, ticket: &SupportTicket) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<SupportTicket>>;

    /// Replace status, replies and `updated_at`. `NotFound` if absent.
    async fn update(&self, ticket: &SupportTicket) -> Result<()>;

    /// Newest first
    async fn list_for_user(&self, username: &str) -> Result<Vec<SupportTicket>>;

    /// Newest first
    async fn list_all(&self) -> Result<Vec<SupportTicket>>;

    async fn delete_for_user(&self, username: &str) -> Result<u64>;
}
