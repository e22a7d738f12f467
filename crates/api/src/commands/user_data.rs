//! Per-feature record commands for the signed-in user
//!
//! Generic over [`FeatureRecord`], so notes, grades, attendance, journal
//! entries, assignments and campus nodes all share one command set. Vault
//! documents go through the vault commands instead, which enforce the quota.

use pocket_domain::{
    ActivityLog, Feature, FeatureRecord, PocketError, Result as DomainResult, UserProfile,
};
use uuid::Uuid;

use crate::context::AppContext;
use crate::utils::command_helpers::{execute_command, require_session};

pub async fn get_profile(ctx: &AppContext) -> DomainResult<UserProfile> {
    execute_command("user_data::get_profile", async {
        let session = require_session(ctx).await?;
        ctx.profiles.require(&session.username).await
    })
    .await
}

/// Audit entries about the signed-in user, newest first
pub async fn my_activity(ctx: &AppContext, limit: usize) -> DomainResult<Vec<ActivityLog>> {
    execute_command("user_data::my_activity", async {
        let session = require_session(ctx).await?;
        ctx.audit.for_user(&session.username, limit).await
    })
    .await
}

pub async fn list_records<T: FeatureRecord>(ctx: &AppContext) -> DomainResult<Vec<T>> {
    execute_command("user_data::list_records", async {
        let session = require_session(ctx).await?;
        ctx.data.list::<T>(&session.username).await
    })
    .await
}

pub async fn get_record<T: FeatureRecord>(ctx: &AppContext, id: Uuid) -> DomainResult<T> {
    execute_command("user_data::get_record", async {
        let session = require_session(ctx).await?;
        ctx.data
            .get::<T>(&session.username, id)
            .await?
            .ok_or_else(|| PocketError::NotFound(format!("{} record {id}", T::FEATURE)))
    })
    .await
}

pub async fn add_record<T: FeatureRecord>(ctx: &AppContext, record: T) -> DomainResult<T> {
    execute_command("user_data::add_record", async {
        ensure_writable::<T>()?;
        let session = require_session(ctx).await?;
        ctx.data.add(&session.username, record).await
    })
    .await
}

pub async fn update_record<T: FeatureRecord>(ctx: &AppContext, record: T) -> DomainResult<T> {
    execute_command("user_data::update_record", async {
        ensure_writable::<T>()?;
        let session = require_session(ctx).await?;
        ctx.data.update(&session.username, record).await
    })
    .await
}

pub async fn remove_record<T: FeatureRecord>(ctx: &AppContext, id: Uuid) -> DomainResult<bool> {
    execute_command("user_data::remove_record", async {
        ensure_writable::<T>()?;
        let session = require_session(ctx).await?;
        Ok(ctx.data.remove::<T>(&session.username, id).await?.is_some())
    })
    .await
}

pub async fn clear_records<T: FeatureRecord>(ctx: &AppContext) -> DomainResult<bool> {
    execute_command("user_data::clear_records", async {
        ensure_writable::<T>()?;
        let session = require_session(ctx).await?;
        ctx.data.clear::<T>(&session.username).await
    })
    .await
}

/// Vault documents count against the storage quota, so only the vault
/// commands may change them.
fn ensure_writable<T: FeatureRecord>() -> DomainResult<()> {
    if T::FEATURE == Feature::VaultDocs {
        return Err(PocketError::InvalidInput(
            "vault documents are managed through the vault commands".into(),
        ));
    }
    Ok(())
}
