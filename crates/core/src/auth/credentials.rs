//! Credential registry: registration, login and account removal.

use std::sync::Arc;

use pocket_common::{Clock, PasswordHasher, SecureString};
use pocket_domain::constants::SYSTEM_ACTOR;
use pocket_domain::keys::user_prefix;
use pocket_domain::{
    ActivityAction, CredentialRecord, PocketError, Result, Role, SecurityConfig, SeedAccount,
    StorageConfig, UserProfile,
};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::ports::CredentialRepository;
use super::validation::{normalize_username, validate_email, validate_password, validate_username};
use crate::audit::AuditTrail;
use crate::kv::ports::KeyValueStore;
use crate::security::ViolationPolicy;
use crate::user_data::ProfileStore;

/// New account details as entered by the user
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub password: SecureString,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Accounts: registration, login, password changes and deletion.
pub struct CredentialService {
    credentials: Arc<dyn CredentialRepository>,
    store: Arc<dyn KeyValueStore>,
    profiles: ProfileStore,
    policy: Arc<ViolationPolicy>,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
    hasher: PasswordHasher,
    storage_limit_bytes: u64,
    max_violations: u32,
}

impl CredentialService {
    /// Uses the default Argon2 hasher; see [`Self::with_hasher`].
    pub fn new(
        credentials: Arc<dyn CredentialRepository>,
        store: Arc<dyn KeyValueStore>,
        policy: Arc<ViolationPolicy>,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
        security: &SecurityConfig,
        storage: &StorageConfig,
    ) -> Self {
        Self {
            profiles: ProfileStore::new(Arc::clone(&store), security.update_retries),
            credentials,
            store,
            policy,
            audit,
            clock,
            hasher: PasswordHasher::new(),
            storage_limit_bytes: storage.default_limit_bytes,
            max_violations: security.max_violations,
        }
    }

    /// Replace the default Argon2 hasher (tests use cheap parameters).
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Create a student account and its profile.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegistrationRequest) -> Result<UserProfile> {
        let profile = self.create_account(request, Role::Student).await?;
        self.audit
            .record(
                &profile.username,
                Some(&profile.username),
                ActivityAction::Register,
                "Account registered",
                None,
            )
            .await?;
        info!(username = %profile.username, "account registered");
        Ok(profile)
    }

    /// Check credentials and return the profile.
    ///
    /// Any failure other than a ban counts as a failed login, including
    /// unknown usernames.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &SecureString) -> Result<UserProfile> {
        let username = normalize_username(username);
        let verified = match self.credentials.get(&username).await? {
            Some(record) => self.verify_password(password, &record.password_hash).await?,
            None => false,
        };

        if !verified {
            let attempts = self.policy.record_failed_login(&username).await?;
            self.audit
                .record(
                    &username,
                    Some(&username),
                    ActivityAction::LoginFailed,
                    "Invalid username or password",
                    Some(json!({ "attempts": attempts })),
                )
                .await?;
            warn!(%username, attempts, "login rejected");
            return Err(PocketError::InvalidCredentials { attempts });
        }

        let profile = self.profiles.require(&username).await?;
        if profile.is_banned {
            let reason = profile.ban_reason.clone().unwrap_or_else(|| "Account banned".into());
            return Err(PocketError::AccountLocked(reason));
        }

        self.policy.reset_failed_logins(&username).await?;
        self.audit
            .record(&username, Some(&username), ActivityAction::Login, "Logged in", None)
            .await?;
        Ok(profile)
    }

    /// Replace the password after checking the current one.
    #[instrument(skip(self, current, new_password))]
    pub async fn change_password(
        &self,
        username: &str,
        current: &SecureString,
        new_password: &SecureString,
    ) -> Result<()> {
        let username = normalize_username(username);
        let username = username.as_str();
        let record = self
            .credentials
            .get(username)
            .await?
            .ok_or_else(|| PocketError::NotFound(format!("credentials for '{username}'")))?;

        if !self.verify_password(current, &record.password_hash).await? {
            return Err(PocketError::Auth("current password is incorrect".into()));
        }
        validate_password(new_password.expose())?;

        let hash = self.hash_password(new_password).await?;
        self.credentials.update_password(username, &hash, self.clock.now()).await?;
        self.audit
            .record(username, Some(username), ActivityAction::PasswordChange, "Password changed", None)
            .await?;
        Ok(())
    }

    /// Remove credentials, every `user:<username>:` key and the failed
    /// login counter. Returns whether anything existed.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, username: &str, actor: &str) -> Result<bool> {
        let username = normalize_username(username);
        let username = username.as_str();
        let had_credentials = self.credentials.delete(username).await?;
        let removed_keys = self.store.delete_prefix(&user_prefix(username)).await?;
        self.policy.reset_failed_logins(username).await?;

        let existed = had_credentials || removed_keys > 0;
        if existed {
            self.audit
                .record(
                    actor,
                    Some(username),
                    ActivityAction::AccountDeleted,
                    "Account deleted",
                    Some(json!({ "removed_keys": removed_keys })),
                )
                .await?;
            info!(username, removed_keys, "account deleted");
        }
        Ok(existed)
    }

    /// Create configured accounts that do not exist yet. Returns how many
    /// were created.
    pub async fn seed_accounts(&self, seeds: &[SeedAccount]) -> Result<usize> {
        let mut created = 0;
        for seed in seeds {
            let username = normalize_username(&seed.username);
            if self.credentials.get(&username).await?.is_some() {
                debug!(%username, "seed account already present");
                continue;
            }

            let request = RegistrationRequest {
                username,
                password: SecureString::new(seed.password.clone()),
                name: seed.name.clone(),
                email: seed.email.clone(),
                phone: (!seed.phone.is_empty()).then(|| seed.phone.clone()),
            };
            let profile = self.create_account(request, seed.role).await?;
            self.audit
                .record(
                    SYSTEM_ACTOR,
                    Some(&profile.username),
                    ActivityAction::AccountSeeded,
                    format!("Seeded {} account", seed.role),
                    None,
                )
                .await?;
            created += 1;
        }
        if created > 0 {
            info!(created, "seed accounts created");
        }
        Ok(created)
    }

    /// All account names, sorted.
    pub async fn list_usernames(&self) -> Result<Vec<String>> {
        self.credentials.list_usernames().await
    }

    /// Role of `username`, `None` for unknown accounts.
    pub async fn role(&self, username: &str) -> Result<Option<Role>> {
        Ok(self.credentials.get(&normalize_username(username)).await?.map(|record| record.role))
    }

    /// `Auth` error unless `username` holds the admin role.
    pub async fn require_admin(&self, username: &str) -> Result<()> {
        match self.role(username).await? {
            Some(Role::Admin) => Ok(()),
            _ => Err(PocketError::Auth(format!("'{username}' is not an administrator"))),
        }
    }

    async fn create_account(&self, request: RegistrationRequest, role: Role) -> Result<UserProfile> {
        let username = normalize_username(&request.username);
        validate_username(&username)?;
        validate_password(request.password.expose())?;
        let email = request.email.trim().to_string();
        validate_email(&email)?;

        if self.credentials.get(&username).await?.is_some() {
            return Err(PocketError::Conflict(format!("username '{username}' is taken")));
        }
        if self.profiles.get(&username).await?.is_some() {
            return Err(PocketError::Conflict(format!("profile '{username}' already exists")));
        }

        let now = self.clock.now();
        let password_hash = self.hash_password(&request.password).await?;
        let record = CredentialRecord {
            username: username.clone(),
            password_hash,
            role,
            created_at: now,
            password_changed_at: now,
        };
        self.credentials.insert(&record).await?;

        let name = match request.name.trim() {
            "" => username.clone(),
            name => name.to_string(),
        };
        let mut profile =
            UserProfile::new(&username, name, email, self.storage_limit_bytes, self.max_violations, now);
        profile.phone = request.phone.unwrap_or_default();

        if let Err(err) = self.profiles.create(&profile).await {
            // Do not leave a credential without a profile behind.
            self.credentials.delete(&username).await?;
            return Err(err);
        }
        Ok(profile)
    }

    async fn hash_password(&self, password: &SecureString) -> Result<String> {
        let hasher = self.hasher.clone();
        let password = password.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| PocketError::Internal(format!("password hashing task failed: {e}")))?
            .map_err(|e| PocketError::Security(e.to_string()))
    }

    async fn verify_password(&self, password: &SecureString, stored: &str) -> Result<bool> {
        let hasher = self.hasher.clone();
        let password = password.clone();
        let stored = stored.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| PocketError::Internal(format!("password verification task failed: {e}")))
    }
}
