//! Vault access and document storage.
//!
//! The vault opens with the user's PIN or, as an administrative override,
//! with a currently valid system key code. Wrong input counts as a
//! violation. Stored documents count against the profile's storage quota.

use std::sync::Arc;

use pocket_common::{Clock, PasswordHasher, SecureString};
use pocket_domain::constants::{INVALID_VAULT_PIN_REASON, VAULT_PIN_MAX_LENGTH, VAULT_PIN_MIN_LENGTH};
use pocket_domain::{ActivityAction, PocketError, Result, VaultDocument, ViolationOutcome};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::audit::AuditTrail;
use crate::security::ViolationPolicy;
use crate::system_key::SystemKeyRotator;
use crate::user_data::{ProfileStore, UserDataService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockMethod {
    Pin,
    SystemKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultUnlock {
    Granted(UnlockMethod),
    /// `outcome` is the violation recorded for this attempt; banned users
    /// are denied without counting a new violation.
    Denied { outcome: Option<ViolationOutcome> },
}

impl VaultUnlock {
    /// Whether the vault opened.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// PIN-protected document vault with a per-user storage quota.
pub struct VaultGuard {
    profiles: ProfileStore,
    data: UserDataService,
    rotator: Arc<SystemKeyRotator>,
    policy: Arc<ViolationPolicy>,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
    hasher: PasswordHasher,
}

impl VaultGuard {
    /// Uses the default Argon2 hasher for PINs.
    pub fn new(
        profiles: ProfileStore,
        data: UserDataService,
        rotator: Arc<SystemKeyRotator>,
        policy: Arc<ViolationPolicy>,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { profiles, data, rotator, policy, audit, clock, hasher: PasswordHasher::new() }
    }

    /// Replace the default Argon2 hasher (tests use cheap parameters).
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Set or replace the vault PIN (4 to 8 digits).
    #[instrument(skip(self, pin))]
    pub async fn set_pin(&self, username: &str, pin: &SecureString) -> Result<()> {
        validate_pin(pin.expose())?;

        let hasher = self.hasher.clone();
        let secret = pin.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| PocketError::Internal(format!("pin hashing task failed: {e}")))?
            .map_err(|e| PocketError::Security(e.to_string()))?;

        let now = self.clock.now();
        let updated = self
            .profiles
            .update(username, |profile| {
                if profile.is_banned {
                    return Err(PocketError::AccountLocked(
                        profile.ban_reason.clone().unwrap_or_else(|| "Account banned".into()),
                    ));
                }
                profile.vault_pin_hash = Some(hash.clone());
                profile.updated_at = now;
                Ok(())
            })
            .await?;
        if updated.is_none() {
            return Err(PocketError::NotFound(format!("profile for '{username}'")));
        }

        self.audit
            .record(username, Some(username), ActivityAction::VaultPinSet, "Vault PIN set", None)
            .await
    }

    /// Try to open the vault with a PIN or a system key code.
    #[instrument(skip(self, input))]
    pub async fn unlock(&self, username: &str, input: &SecureString) -> Result<VaultUnlock> {
        let profile = self.profiles.require(username).await?;
        if profile.is_banned {
            warn!(username, "vault unlock refused for banned account");
            return Ok(VaultUnlock::Denied { outcome: None });
        }

        if self.rotator.validate(input.expose()).await? {
            warn!(username, "vault opened with system key override");
            self.audit
                .record(
                    username,
                    Some(username),
                    ActivityAction::VaultOverride,
                    "Vault opened with system key",
                    None,
                )
                .await?;
            return Ok(VaultUnlock::Granted(UnlockMethod::SystemKey));
        }

        let pin_matches = match profile.vault_pin_hash {
            Some(stored) => {
                let hasher = self.hasher.clone();
                let candidate = SecureString::new(input.expose().trim());
                tokio::task::spawn_blocking(move || hasher.verify(&candidate, &stored))
                    .await
                    .map_err(|e| PocketError::Internal(format!("pin verification task failed: {e}")))?
            }
            None => false,
        };

        if pin_matches {
            self.audit
                .record(username, Some(username), ActivityAction::VaultUnlocked, "Vault unlocked", None)
                .await?;
            return Ok(VaultUnlock::Granted(UnlockMethod::Pin));
        }

        let outcome = self.policy.record_violation(username, INVALID_VAULT_PIN_REASON).await?;
        Ok(VaultUnlock::Denied { outcome })
    }

    /// Documents in the user's vault.
    pub async fn list_documents(&self, username: &str) -> Result<Vec<VaultDocument>> {
        self.data.list::<VaultDocument>(username).await
    }

    /// Store a document if it fits in the remaining quota.
    #[instrument(skip(self, document), fields(size = document.size_bytes))]
    pub async fn store_document(&self, username: &str, document: VaultDocument) -> Result<VaultDocument> {
        let size = document.size_bytes;
        let now = self.clock.now();
        let reserved = self
            .profiles
            .update(username, |profile| {
                if profile.is_banned {
                    return Err(PocketError::AccountLocked(
                        profile.ban_reason.clone().unwrap_or_else(|| "Account banned".into()),
                    ));
                }
                let available = profile.storage_available();
                if size > available {
                    return Err(PocketError::InvalidInput(format!(
                        "storage quota exceeded: {size} bytes requested, {available} available"
                    )));
                }
                profile.storage_used_bytes += size;
                profile.updated_at = now;
                Ok(())
            })
            .await?;
        if reserved.is_none() {
            return Err(PocketError::NotFound(format!("profile for '{username}'")));
        }

        let stored = match self.data.add(username, document).await {
            Ok(stored) => stored,
            Err(err) => {
                self.release(username, size).await?;
                return Err(err);
            }
        };

        info!(username, id = %stored.id, size, "vault document stored");
        self.audit
            .record(
                username,
                Some(username),
                ActivityAction::VaultDocumentStored,
                format!("Stored {}", stored.name),
                Some(json!({ "id": stored.id, "size_bytes": size })),
            )
            .await?;
        Ok(stored)
    }

    /// Remove a document and release its quota. Returns whether it existed.
    pub async fn remove_document(&self, username: &str, id: Uuid) -> Result<bool> {
        let Some(removed) = self.data.remove::<VaultDocument>(username, id).await? else {
            return Ok(false);
        };
        self.release(username, removed.size_bytes).await?;
        self.audit
            .record(
                username,
                Some(username),
                ActivityAction::VaultDocumentRemoved,
                format!("Removed {}", removed.name),
                Some(json!({ "id": id, "size_bytes": removed.size_bytes })),
            )
            .await?;
        Ok(true)
    }

    async fn release(&self, username: &str, size: u64) -> Result<()> {
        let now = self.clock.now();
        self.profiles
            .update(username, |profile| {
                profile.storage_used_bytes = profile.storage_used_bytes.saturating_sub(size);
                profile.updated_at = now;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn validate_pin(pin: &str) -> Result<()> {
    let len = pin.len();
    if !(VAULT_PIN_MIN_LENGTH..=VAULT_PIN_MAX_LENGTH).contains(&len)
        || !pin.chars().all(|c| c.is_ascii_digit())
    {
        return Err(PocketError::InvalidInput(format!(
            "vault PIN must be {VAULT_PIN_MIN_LENGTH}-{VAULT_PIN_MAX_LENGTH} digits"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_rules() {
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("12345678").is_ok());
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("123456789").is_err());
        assert!(validate_pin("12a4").is_err());
    }
}
