//! Port interfaces for credentials and the device session

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pocket_domain::{CredentialRecord, Result, Session};

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn get(&self, username: &str) -> Result<Option<CredentialRecord>>;

    /// `Conflict` if the username is taken
    async fn insert(&self, record: &CredentialRecord) -> Result<()>;

    /// Returns whether a credential was updated
    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn delete(&self, username: &str) -> Result<bool>;

    /// Sorted
    async fn list_usernames(&self) -> Result<Vec<String>>;
}

/// The single active session on this device
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn load(&self) -> Result<Option<Session>>;

    /// Replaces any existing session
    async fn store(&self, session: &Session) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}
