//! Violation counting and security lockdown.
//!
//! A violation is a counted policy infraction. When a profile's count
//! reaches its `max_violations` the account is locked down: banned, marked
//! suspicious, verification reset and level zeroed.

pub mod ports;

use std::sync::Arc;

use pocket_common::Clock;
use pocket_domain::constants::{BADGE_BANNED, FAILED_LOGIN_LOCKDOWN_REASON, SYSTEM_ACTOR};
use pocket_domain::{ActivityAction, Result, UserProfile, ViolationOutcome};
use serde_json::json;
use tracing::{info, instrument, warn};

use self::ports::FailedLoginRepository;
use crate::audit::AuditTrail;
use crate::auth::normalize_username;
use crate::user_data::ProfileStore;

/// Violation counting, lockdowns and the failed-login counter.
pub struct ViolationPolicy {
    profiles: ProfileStore,
    failed_logins: Arc<dyn FailedLoginRepository>,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
    max_failed_logins: u32,
}

impl ViolationPolicy {
    /// `max_failed_logins` bad passwords in a row trigger a lockdown.
    pub fn new(
        profiles: ProfileStore,
        failed_logins: Arc<dyn FailedLoginRepository>,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
        max_failed_logins: u32,
    ) -> Self {
        Self { profiles, failed_logins, audit, clock, max_failed_logins }
    }

    /// Count one violation against `username`.
    ///
    /// Unknown users are ignored and yield `None`; no state is created.
    /// Reaching the profile's threshold locks the account down in the same
    /// write that stores the new count.
    #[instrument(skip(self))]
    pub async fn record_violation(
        &self,
        username: &str,
        reason: &str,
    ) -> Result<Option<ViolationOutcome>> {
        let now = self.clock.now();
        let updated = self
            .profiles
            .update(username, |profile| {
                profile.violation_count = profile.violation_count.saturating_add(1);
                let locked_down = profile.violation_count >= profile.max_violations;
                if locked_down {
                    profile.lock_down(reason, now);
                } else {
                    profile.updated_at = now;
                }
                Ok(ViolationOutcome {
                    violation_count: profile.violation_count,
                    max_violations: profile.max_violations,
                    locked_down,
                })
            })
            .await?;

        let Some((_, outcome)) = updated else {
            return Ok(None);
        };

        if outcome.locked_down {
            warn!(username, count = outcome.violation_count, "violation threshold reached");
            self.audit
                .record(
                    SYSTEM_ACTOR,
                    Some(username),
                    ActivityAction::SecurityLockdown,
                    format!("Account locked: {reason}"),
                    Some(json!({
                        "violation_count": outcome.violation_count,
                        "max_violations": outcome.max_violations,
                    })),
                )
                .await?;
        } else {
            info!(username, count = outcome.violation_count, max = outcome.max_violations, "violation recorded");
            self.audit
                .record(
                    SYSTEM_ACTOR,
                    Some(username),
                    ActivityAction::SecurityViolation,
                    reason,
                    Some(json!({
                        "violation_count": outcome.violation_count,
                        "max_violations": outcome.max_violations,
                    })),
                )
                .await?;
        }

        Ok(Some(outcome))
    }

    /// Ban `username` immediately. `None` if there is no such profile.
    #[instrument(skip(self, context))]
    pub async fn enforce_security_lockdown(
        &self,
        username: &str,
        reason: &str,
        context: Option<serde_json::Value>,
    ) -> Result<Option<UserProfile>> {
        let now = self.clock.now();
        let updated = self
            .profiles
            .update(username, |profile| {
                profile.lock_down(reason, now);
                Ok(())
            })
            .await?;

        let Some((profile, ())) = updated else {
            return Ok(None);
        };

        warn!(username, reason, "security lockdown enforced");
        let metadata = json!({ "reason": reason, "context": context });
        self.audit
            .record(
                SYSTEM_ACTOR,
                Some(username),
                ActivityAction::SecurityLockdown,
                format!("Account locked: {reason}"),
                Some(metadata),
            )
            .await?;

        Ok(Some(profile))
    }

    /// Count a failed login and lock the account down at the threshold.
    ///
    /// The counter exists even for usernames without a profile; the
    /// lockdown is then a no-op. Returns the new count.
    #[instrument(skip(self))]
    pub async fn record_failed_login(&self, username: &str) -> Result<u32> {
        let attempts = self.failed_logins.increment(username).await?;
        info!(username, attempts, "failed login recorded");

        if attempts >= self.max_failed_logins {
            self.enforce_security_lockdown(
                username,
                FAILED_LOGIN_LOCKDOWN_REASON,
                Some(json!({ "failed_attempts": attempts })),
            )
            .await?;
        }
        Ok(attempts)
    }

    /// Current failed-login count.
    pub async fn failed_logins(&self, username: &str) -> Result<u32> {
        self.failed_logins.get(username).await
    }

    /// Zero the failed-login count.
    pub async fn reset_failed_logins(&self, username: &str) -> Result<()> {
        self.failed_logins.reset(username).await
    }

    /// Admin action: clear the ban, the violation count and the failed
    /// login counter. The `SECURITY_RISK` badge stays as history.
    #[instrument(skip(self))]
    pub async fn lift_ban(&self, username: &str, admin: &str) -> Result<Option<UserProfile>> {
        let username = normalize_username(username);
        let username = username.as_str();
        let now = self.clock.now();
        let updated = self
            .profiles
            .update(username, |profile| {
                profile.is_banned = false;
                profile.is_suspicious = false;
                profile.ban_reason = None;
                profile.violation_count = 0;
                profile.level = profile.level.max(1);
                profile.remove_badge(BADGE_BANNED);
                profile.updated_at = now;
                Ok(())
            })
            .await?;

        let Some((profile, ())) = updated else {
            return Ok(None);
        };

        self.failed_logins.reset(username).await?;
        info!(username, admin, "ban lifted");
        self.audit
            .record(admin, Some(username), ActivityAction::BanLifted, "Ban lifted by admin", None)
            .await?;

        Ok(Some(profile))
    }
}
