//! Device session: who is logged in, until when.

use std::sync::Arc;

use chrono::Duration;
use pocket_common::Clock;
use pocket_domain::{PocketError, Result, Session, SessionConfig};
use tracing::{debug, info};
use uuid::Uuid;

use super::ports::SessionRepository;

/// Single-device login session with a fixed time-to-live.
pub struct SessionService {
    repository: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionService {
    /// Sessions last `config.ttl_secs`.
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
        config: &SessionConfig,
    ) -> Self {
        let ttl_secs = i64::try_from(config.ttl_secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        Self { repository, clock, ttl: Duration::seconds(ttl_secs) }
    }

    /// Start a session for `username`, replacing any current one.
    pub async fn start(&self, username: &str) -> Result<Session> {
        let now = self.clock.now();
        let session = Session {
            token: Uuid::new_v4(),
            username: username.to_string(),
            created_at: now,
            expires_at: now.checked_add_signed(self.ttl).ok_or_else(|| {
                PocketError::Config("session.ttl_secs overflows the session expiry".into())
            })?,
        };
        self.repository.store(&session).await?;
        info!(username, expires_at = %session.expires_at, "session started");
        Ok(session)
    }

    /// The live session, if any. Expired sessions are cleared.
    pub async fn current(&self) -> Result<Option<Session>> {
        match self.repository.load().await? {
            Some(session) if session.is_expired(self.clock.now()) => {
                debug!(username = %session.username, "session expired");
                self.repository.clear().await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Log out.
    pub async fn end(&self) -> Result<()> {
        self.repository.clear().await
    }
}
