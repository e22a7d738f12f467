//! Audit trail shared by the services.

pub mod ports;

use std::sync::Arc;

use chrono::Duration;
use pocket_common::Clock;
use pocket_domain::{ActivityAction, ActivityLog, Result};
use tracing::{debug, info};

use self::ports::ActivityLogRepository;

/// Builds timestamped [`ActivityLog`] entries and appends them.
#[derive(Clone)]
pub struct AuditTrail {
    repository: Arc<dyn ActivityLogRepository>,
    clock: Arc<dyn Clock>,
}

impl AuditTrail {
    pub fn new(repository: Arc<dyn ActivityLogRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Append an entry about `target_user`, performed by `actor`.
    pub async fn record(
        &self,
        actor: &str,
        target_user: Option<&str>,
        action: ActivityAction,
        description: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) -> Result<()> {
        let mut entry = ActivityLog::new(actor, action, description, self.clock.now());
        if let Some(target) = target_user {
            entry = entry.for_user(target);
        }
        if let Some(metadata) = metadata {
            entry = entry.with_metadata(metadata);
        }
        debug!(action = %entry.action, actor = %entry.actor, "audit");
        self.repository.append(entry).await
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<ActivityLog>> {
        self.repository.recent(limit).await
    }

    pub async fn for_user(&self, username: &str, limit: usize) -> Result<Vec<ActivityLog>> {
        self.repository.for_user(username, limit).await
    }

    /// Drop entries older than `days` days.
    pub async fn purge_older_than(&self, days: u32) -> Result<u64> {
        let cutoff = self.clock.now() - Duration::days(i64::from(days));
        let removed = self.repository.purge_before(cutoff).await?;
        if removed > 0 {
            info!(removed, days, "purged old activity log entries");
        }
        Ok(removed)
    }
}
