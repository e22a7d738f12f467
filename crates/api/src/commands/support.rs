//! Change requests and support tickets raised by the signed-in user

use pocket_domain::{
    ChangeRequest, PocketError, ProfileField, Result as DomainResult, Role, SupportTicket,
};
use uuid::Uuid;

use crate::context::AppContext;
use crate::utils::command_helpers::{execute_command, require_session};

/// Ask an administrator to change a profile field.
pub async fn submit_change_request(
    ctx: &AppContext,
    field: ProfileField,
    value: &str,
) -> DomainResult<ChangeRequest> {
    execute_command("support::submit_change_request", async {
        let session = require_session(ctx).await?;
        ctx.desk.submit_change(&session.username, field, value).await
    })
    .await
}

pub async fn my_change_requests(ctx: &AppContext) -> DomainResult<Vec<ChangeRequest>> {
    execute_command("support::my_change_requests", async {
        let session = require_session(ctx).await?;
        ctx.desk.changes_for_user(&session.username).await
    })
    .await
}

pub async fn open_ticket(
    ctx: &AppContext,
    subject: &str,
    message: &str,
) -> DomainResult<SupportTicket> {
    execute_command("support::open_ticket", async {
        let session = require_session(ctx).await?;
        ctx.desk.open_ticket(&session.username, subject, message).await
    })
    .await
}

/// Reply on a ticket. Owners reply to their own tickets, admins to any.
pub async fn reply_to_ticket(
    ctx: &AppContext,
    id: Uuid,
    message: &str,
) -> DomainResult<SupportTicket> {
    execute_command("support::reply_to_ticket", async {
        let session = require_session(ctx).await?;
        let owns_ticket =
            ctx.desk.tickets_for_user(&session.username).await?.iter().any(|t| t.id == id);
        if !owns_ticket && ctx.accounts.role(&session.username).await? != Some(Role::Admin) {
            return Err(PocketError::NotFound(format!("ticket {id}")));
        }
        ctx.desk.reply(id, &session.username, message).await
    })
    .await
}

pub async fn my_tickets(ctx: &AppContext) -> DomainResult<Vec<SupportTicket>> {
    execute_command("support::my_tickets", async {
        let session = require_session(ctx).await?;
        ctx.desk.tickets_for_user(&session.username).await
    })
    .await
}
