//! Administrator commands
//!
//! All of these require a live session whose account holds the admin role.

use pocket_domain::{
    ActivityLog, ChangeRequest, PocketError, RequestStatus, Result as DomainResult, SupportTicket,
    SystemKeyState, TicketStatus, UserProfile,
};
use pocket_core::auth::normalize_username;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::context::AppContext;
use crate::utils::command_helpers::{execute_command, require_admin_session};

#[derive(Debug, Clone, Serialize)]
pub struct SystemKeyStatus {
    pub state: SystemKeyState,
    /// Seconds until the next phase change
    pub remaining_secs: i64,
}

/// Profiles of every registered account, sorted by username
pub async fn list_users(ctx: &AppContext) -> DomainResult<Vec<UserProfile>> {
    execute_command("admin::list_users", async {
        require_admin_session(ctx).await?;
        let mut profiles = Vec::new();
        for username in ctx.accounts.list_usernames().await? {
            if let Some(profile) = ctx.profiles.get(&username).await? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    })
    .await
}

pub async fn lift_ban(ctx: &AppContext, username: &str) -> DomainResult<UserProfile> {
    execute_command("admin::lift_ban", async {
        let admin = require_admin_session(ctx).await?;
        ctx.policy
            .lift_ban(username, &admin.username)
            .await?
            .ok_or_else(|| PocketError::NotFound(format!("profile for '{username}'")))
    })
    .await
}

pub async fn current_system_key(ctx: &AppContext) -> DomainResult<SystemKeyStatus> {
    execute_command("admin::current_system_key", async {
        require_admin_session(ctx).await?;
        let state = ctx.rotator.current_state().await?;
        let remaining_secs = ctx.rotator.remaining_secs().await?;
        Ok(SystemKeyStatus { state, remaining_secs })
    })
    .await
}

/// Start a fresh ACTIVE phase with a new pin.
pub async fn force_rotate_system_key(ctx: &AppContext) -> DomainResult<SystemKeyState> {
    execute_command("admin::force_rotate_system_key", async {
        let admin = require_admin_session(ctx).await?;
        ctx.rotator.force_rotate(&admin.username).await
    })
    .await
}

pub async fn recent_activity(ctx: &AppContext, limit: usize) -> DomainResult<Vec<ActivityLog>> {
    execute_command("admin::recent_activity", async {
        require_admin_session(ctx).await?;
        ctx.audit.recent(limit).await
    })
    .await
}

pub async fn user_activity(
    ctx: &AppContext,
    username: &str,
    limit: usize,
) -> DomainResult<Vec<ActivityLog>> {
    execute_command("admin::user_activity", async {
        require_admin_session(ctx).await?;
        ctx.audit.for_user(username, limit).await
    })
    .await
}

pub async fn pending_change_requests(ctx: &AppContext) -> DomainResult<Vec<ChangeRequest>> {
    execute_command("admin::pending_change_requests", async {
        require_admin_session(ctx).await?;
        ctx.desk.list_changes(Some(RequestStatus::Pending)).await
    })
    .await
}

pub async fn approve_change_request(ctx: &AppContext, id: Uuid) -> DomainResult<UserProfile> {
    execute_command("admin::approve_change_request", async {
        let admin = require_admin_session(ctx).await?;
        ctx.desk.approve_change(id, &admin.username).await
    })
    .await
}

pub async fn reject_change_request(ctx: &AppContext, id: Uuid) -> DomainResult<()> {
    execute_command("admin::reject_change_request", async {
        let admin = require_admin_session(ctx).await?;
        ctx.desk.reject_change(id, &admin.username).await
    })
    .await
}

pub async fn all_tickets(ctx: &AppContext) -> DomainResult<Vec<SupportTicket>> {
    execute_command("admin::all_tickets", async {
        require_admin_session(ctx).await?;
        ctx.desk.all_tickets().await
    })
    .await
}

pub async fn set_ticket_status(
    ctx: &AppContext,
    id: Uuid,
    status: TicketStatus,
) -> DomainResult<SupportTicket> {
    execute_command("admin::set_ticket_status", async {
        let admin = require_admin_session(ctx).await?;
        ctx.desk.set_ticket_status(id, status, &admin.username).await
    })
    .await
}

/// Remove another account with its data, requests and tickets.
pub async fn delete_user(ctx: &AppContext, username: &str) -> DomainResult<bool> {
    execute_command("admin::delete_user", async {
        let admin = require_admin_session(ctx).await?;
        let username = normalize_username(username);
        let username = username.as_str();
        if admin.username == username {
            return Err(PocketError::InvalidInput(
                "administrators cannot delete their own account here".into(),
            ));
        }
        let existed = ctx.accounts.delete_account(username, &admin.username).await?;
        ctx.desk.purge_user(username).await?;
        info!(username, admin = %admin.username, existed, "account removed by administrator");
        Ok(existed)
    })
    .await
}
