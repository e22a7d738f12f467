//! File vault commands

use pocket_common::SecureString;
use pocket_core::VaultUnlock;
use pocket_domain::{Result as DomainResult, VaultDocument};
use uuid::Uuid;

use crate::context::AppContext;
use crate::utils::command_helpers::{execute_command, require_session};

pub async fn set_vault_pin(ctx: &AppContext, pin: &SecureString) -> DomainResult<()> {
    execute_command("vault::set_vault_pin", async {
        let session = require_session(ctx).await?;
        ctx.vault.set_pin(&session.username, pin).await
    })
    .await
}

/// Accepts the user's PIN or a live system key code. Wrong input counts as a
/// security violation.
pub async fn unlock_vault(ctx: &AppContext, input: &SecureString) -> DomainResult<VaultUnlock> {
    execute_command("vault::unlock_vault", async {
        let session = require_session(ctx).await?;
        ctx.vault.unlock(&session.username, input).await
    })
    .await
}

pub async fn list_vault_documents(ctx: &AppContext) -> DomainResult<Vec<VaultDocument>> {
    execute_command("vault::list_vault_documents", async {
        let session = require_session(ctx).await?;
        ctx.vault.list_documents(&session.username).await
    })
    .await
}

pub async fn store_vault_document(
    ctx: &AppContext,
    document: VaultDocument,
) -> DomainResult<VaultDocument> {
    execute_command("vault::store_vault_document", async {
        let session = require_session(ctx).await?;
        ctx.vault.store_document(&session.username, document).await
    })
    .await
}

pub async fn remove_vault_document(ctx: &AppContext, id: Uuid) -> DomainResult<bool> {
    execute_command("vault::remove_vault_document", async {
        let session = require_session(ctx).await?;
        ctx.vault.remove_document(&session.username, id).await
    })
    .await
}
