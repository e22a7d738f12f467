//! Account and session commands

use pocket_common::SecureString;
use pocket_core::RegistrationRequest;
use pocket_domain::{ActivityAction, Result as DomainResult, Session, UserProfile};
use serde::Serialize;
use tracing::info;

use crate::context::AppContext;
use crate::utils::command_helpers::{execute_command, require_session};

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub session: Session,
    pub profile: UserProfile,
}

pub async fn register(ctx: &AppContext, request: RegistrationRequest) -> DomainResult<UserProfile> {
    execute_command("auth::register", ctx.accounts.register(request)).await
}

/// Verify credentials and persist a new session, replacing any previous one.
pub async fn login(
    ctx: &AppContext,
    username: &str,
    password: &SecureString,
) -> DomainResult<LoginResponse> {
    execute_command("auth::login", async {
        let profile = ctx.accounts.authenticate(username, password).await?;
        let session = ctx.session.start(&profile.username).await?;
        info!(username = %profile.username, expires_at = %session.expires_at, "session started");
        Ok(LoginResponse { session, profile })
    })
    .await
}

pub async fn logout(ctx: &AppContext) -> DomainResult<()> {
    execute_command("auth::logout", async {
        if let Some(session) = ctx.session.current().await? {
            ctx.audit
                .record(
                    &session.username,
                    Some(&session.username),
                    ActivityAction::Logout,
                    "Logged out",
                    None,
                )
                .await?;
        }
        ctx.session.end().await
    })
    .await
}

/// Profile of the signed-in user, `None` without a live session.
pub async fn current_user(ctx: &AppContext) -> DomainResult<Option<UserProfile>> {
    execute_command("auth::current_user", async {
        match ctx.session.current().await? {
            Some(session) => ctx.profiles.get(&session.username).await,
            None => Ok(None),
        }
    })
    .await
}

pub async fn change_password(
    ctx: &AppContext,
    current: &SecureString,
    new_password: &SecureString,
) -> DomainResult<()> {
    execute_command("auth::change_password", async {
        let session = require_session(ctx).await?;
        ctx.accounts.change_password(&session.username, current, new_password).await
    })
    .await
}

/// Delete the signed-in account with all its data, then sign out.
pub async fn delete_my_account(ctx: &AppContext) -> DomainResult<bool> {
    execute_command("auth::delete_my_account", async {
        let session = require_session(ctx).await?;
        let existed = ctx.accounts.delete_account(&session.username, &session.username).await?;
        ctx.desk.purge_user(&session.username).await?;
        ctx.session.end().await?;
        Ok(existed)
    })
    .await
}
