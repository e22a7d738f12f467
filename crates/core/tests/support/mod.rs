//! Shared test helpers for `pocket-core` integration tests.
//!
//! [`Harness`] wires every service to in-memory ports and a [`MockClock`],
//! so tests can move time and inspect stored state directly.

#![allow(dead_code)]

pub mod repositories;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use pocket_common::{Clock, MockClock, PasswordHasher, SecureString};
use pocket_core::{
    AuditTrail, CredentialService, ProfileStore, RegistrationRequest, SessionService,
    SupportDesk, SystemKeyRotator, UserDataService, VaultGuard, ViolationPolicy,
};
use pocket_domain::{Config, UserProfile};

use self::repositories::{
    InMemoryActivityLog, InMemoryChangeRequests, InMemoryCredentials, InMemoryFailedLogins,
    InMemoryKeyValueStore, InMemorySessions, InMemorySupportTickets, InMemorySystemConfig,
};

pub const PASSWORD: &str = "correct-horse-42";

pub struct Harness {
    pub clock: MockClock,
    pub config: Config,
    pub kv: Arc<InMemoryKeyValueStore>,
    pub logs: Arc<InMemoryActivityLog>,
    pub system: Arc<InMemorySystemConfig>,
    pub credentials: Arc<InMemoryCredentials>,
    pub failed_logins: Arc<InMemoryFailedLogins>,
    pub sessions: Arc<InMemorySessions>,
    pub requests: Arc<InMemoryChangeRequests>,
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

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let clock = MockClock::at(Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap());
        let dyn_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let retries = config.security.update_retries;

        let kv = Arc::new(InMemoryKeyValueStore::default());
        let logs = Arc::new(InMemoryActivityLog::default());
        let system = Arc::new(InMemorySystemConfig::default());
        let credentials = Arc::new(InMemoryCredentials::default());
        let failed_logins = Arc::new(InMemoryFailedLogins::default());
        let sessions = Arc::new(InMemorySessions::default());
        let requests = Arc::new(InMemoryChangeRequests::default());

        let audit = AuditTrail::new(logs.clone(), dyn_clock.clone());
        let profiles = ProfileStore::new(kv.clone(), retries);
        let policy = Arc::new(ViolationPolicy::new(
            profiles.clone(),
            failed_logins.clone(),
            audit.clone(),
            dyn_clock.clone(),
            config.security.max_failed_logins,
        ));
        let rotator = Arc::new(SystemKeyRotator::new(
            system.clone(),
            audit.clone(),
            dyn_clock.clone(),
            &config.key_rotation,
        ));
        let accounts = CredentialService::new(
            credentials.clone(),
            kv.clone(),
            policy.clone(),
            audit.clone(),
            dyn_clock.clone(),
            &config.security,
            &config.storage,
        )
        .with_hasher(cheap_hasher());
        let session = SessionService::new(sessions.clone(), dyn_clock.clone(), &config.session);
        let data = UserDataService::new(kv.clone(), dyn_clock.clone(), retries);
        let vault = VaultGuard::new(
            profiles.clone(),
            data.clone(),
            rotator.clone(),
            policy.clone(),
            audit.clone(),
            dyn_clock.clone(),
        )
        .with_hasher(cheap_hasher());
        let desk = SupportDesk::new(
            requests.clone(),
            Arc::new(InMemorySupportTickets::default()),
            profiles.clone(),
            audit.clone(),
            dyn_clock,
        );

        Self {
            clock,
            config,
            kv,
            logs,
            system,
            credentials,
            failed_logins,
            sessions,
            requests,
            audit,
            profiles,
            policy,
            rotator,
            accounts,
            session,
            data,
            vault,
            desk,
        }
    }

    /// Register `username` with [`PASSWORD`].
    pub async fn register(&self, username: &str) -> UserProfile {
        self.accounts
            .register(RegistrationRequest {
                username: username.to_string(),
                password: SecureString::new(PASSWORD),
                name: format!("{username} test"),
                email: format!("{username}@uni.edu"),
                phone: None,
            })
            .await
            .unwrap()
    }

    /// Store a bare profile (no credentials) with the given violation count.
    pub async fn seed_profile(&self, username: &str, violation_count: u32) -> UserProfile {
        let mut profile = UserProfile::new(
            username,
            username,
            format!("{username}@uni.edu"),
            self.config.storage.default_limit_bytes,
            self.config.security.max_violations,
            self.clock.now(),
        );
        profile.violation_count = violation_count;
        profile.level = 4;
        self.profiles.create(&profile).await.unwrap();
        profile
    }
}

pub fn cheap_hasher() -> PasswordHasher {
    PasswordHasher::with_params(8, 1, 1).unwrap()
}
