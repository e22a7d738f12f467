//! Application context - dependency injection container
//!
//! Opens the encrypted database, applies migrations and wires every core
//! service to its SQLCipher repository. Commands receive `&AppContext`.

use std::sync::Arc;

use pocket_common::{Clock, PasswordHasher, SystemClock};
use pocket_core::{
    AuditTrail, CredentialService, KeyValueStore, ProfileStore, SessionService, SupportDesk,
    SystemKeyRotator, UserDataService, VaultGuard, ViolationPolicy,
};
use pocket_domain::{Config, PocketError, Result};
use pocket_infra::{
    config, DbManager, KeyManager, SqlCipherActivityLogRepository, SqlCipherChangeRequestRepository,
    SqlCipherCredentialRepository, SqlCipherFailedLoginRepository, SqlCipherKeyValueStore,
    SqlCipherSessionRepository, SqlCipherSupportTicketRepository, SqlCipherSystemConfigRepository,
};
use tracing::{debug, info, warn};

/// Environment variable tests use to bypass the OS keyring
pub const TEST_KEY_ENV: &str = "TEST_DATABASE_ENCRYPTION_KEY";

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub clock: Arc<dyn Clock>,
    pub audit: AuditTrail,
    pub profiles: ProfileStore,
    pub policy: Arc<ViolationPolicy>,
    pub rotator: Arc<SystemKeyRotator>,
    pub accounts: CredentialService,
    pub session: SessionService,
    pub data: UserDataService,
    pub vault: VaultGuard,
    pub desk: SupportDesk,
}

/// Collaborators that tests swap out
#[derive(Clone)]
pub struct ContextOptions {
    pub clock: Arc<dyn Clock>,
    pub hasher: PasswordHasher,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self { clock: Arc::new(SystemClock), hasher: PasswordHasher::new() }
    }
}

impl AppContext {
    /// Load configuration from the environment or a config file and build
    /// the context.
    pub async fn new() -> Result<Self> {
        let config = config::load()?;
        Self::new_with_config(config).await
    }

    /// Create a context with an explicit configuration
    pub async fn new_with_config(config: Config) -> Result<Self> {
        Self::new_with_options(config, ContextOptions::default()).await
    }

    pub async fn new_with_options(config: Config, options: ContextOptions) -> Result<Self> {
        config.validate()?;
        let ContextOptions { clock, hasher } = options;

        let encryption_key = resolve_encryption_key(&config)?;
        let db = Arc::new(DbManager::new(
            &config.database.path,
            config.database.pool_size,
            Some(encryption_key.as_str()),
        )?);
        db.run_migrations()?;

        let retries = config.security.update_retries;
        let kv: Arc<dyn KeyValueStore> = Arc::new(SqlCipherKeyValueStore::new(Arc::clone(&db)));
        let audit = AuditTrail::new(
            Arc::new(SqlCipherActivityLogRepository::new(Arc::clone(&db))),
            Arc::clone(&clock),
        );
        let profiles = ProfileStore::new(Arc::clone(&kv), retries);

        let policy = Arc::new(ViolationPolicy::new(
            profiles.clone(),
            Arc::new(SqlCipherFailedLoginRepository::new(Arc::clone(&db))),
            audit.clone(),
            Arc::clone(&clock),
            config.security.max_failed_logins,
        ));
        let rotator = Arc::new(SystemKeyRotator::new(
            Arc::new(SqlCipherSystemConfigRepository::new(Arc::clone(&db))),
            audit.clone(),
            Arc::clone(&clock),
            &config.key_rotation,
        ));

        let accounts = CredentialService::new(
            Arc::new(SqlCipherCredentialRepository::new(Arc::clone(&db))),
            Arc::clone(&kv),
            Arc::clone(&policy),
            audit.clone(),
            Arc::clone(&clock),
            &config.security,
            &config.storage,
        )
        .with_hasher(hasher.clone());
        let session = SessionService::new(
            Arc::new(SqlCipherSessionRepository::new(Arc::clone(&db))),
            Arc::clone(&clock),
            &config.session,
        );

        let data = UserDataService::new(Arc::clone(&kv), Arc::clone(&clock), retries);
        let vault = VaultGuard::new(
            profiles.clone(),
            data.clone(),
            Arc::clone(&rotator),
            Arc::clone(&policy),
            audit.clone(),
            Arc::clone(&clock),
        )
        .with_hasher(hasher);
        let desk = SupportDesk::new(
            Arc::new(SqlCipherChangeRequestRepository::new(Arc::clone(&db))),
            Arc::new(SqlCipherSupportTicketRepository::new(Arc::clone(&db))),
            profiles.clone(),
            audit.clone(),
            Arc::clone(&clock),
        );

        let ctx = Self {
            config,
            db,
            clock,
            audit,
            profiles,
            policy,
            rotator,
            accounts,
            session,
            data,
            vault,
            desk,
        };
        ctx.startup().await?;
        Ok(ctx)
    }

    /// Seed configured accounts and apply audit retention.
    async fn startup(&self) -> Result<()> {
        let seeded = self.accounts.seed_accounts(&self.config.seed_accounts).await?;
        if seeded > 0 {
            info!(seeded, "seeded configured accounts");
        }

        if let Some(days) = self.config.storage.activity_retention_days {
            self.audit.purge_older_than(days).await?;
        }

        // Materialise the key state so the first validation does not race
        // a concurrent initialisation.
        let state = self.rotator.current_state().await?;
        debug!(status = %state.status, "system key ready");

        info!(
            db_path = %self.db.path().display(),
            schema_version = self.db.schema_version()?,
            "application context initialised"
        );
        Ok(())
    }

    /// Close out the context. Pool connections are released on drop.
    pub async fn shutdown(&self) -> Result<()> {
        let metrics = self.db.pool_metrics();
        info!(
            connections_acquired = metrics.connections_acquired,
            connections_timeout = metrics.connections_timeout,
            "application context shutting down"
        );
        Ok(())
    }
}

/// Resolve the SQLCipher key:
/// 1. `database.encryption_key` from config (`POCKET_DB_ENCRYPTION_KEY`)
/// 2. `TEST_DATABASE_ENCRYPTION_KEY` (tests, never touches the keyring)
/// 3. `KeyManager` (OS keyring, generated on first run)
fn resolve_encryption_key(config: &Config) -> Result<String> {
    if let Some(key) = config.database.encryption_key.as_deref().filter(|k| !k.is_empty()) {
        debug!("using configured database encryption key");
        return Ok(key.to_string());
    }

    if let Ok(value) = std::env::var(TEST_KEY_ENV) {
        debug!("using {TEST_KEY_ENV} for database encryption");
        return Ok(value);
    }

    info!("fetching database encryption key from OS keyring");
    KeyManager::get_or_create_key().map_err(|err| {
        warn!(error = %err, "failed to retrieve encryption key from keyring");
        match err {
            PocketError::Security(_) => err,
            other => PocketError::Security(format!("encryption key unavailable: {other}")),
        }
    })
}
