//! Port interfaces for the append-only activity log

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pocket_domain::{ActivityLog, Result};

#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    async fn append(&self, entry: ActivityLog) -> Result<()>;

    /// Newest first
    async fn recent(&self, limit: usize) -> Result<Vec<ActivityLog>>;

    /// Entries whose target is `username`, newest first
    async fn for_user(&self, username: &str, limit: usize) -> Result<Vec<ActivityLog>>;

    /// Entries in `[start, end)`, oldest first
    async fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<ActivityLog>>;

    /// Delete entries older than `cutoff`. Returns the number removed.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
