//! End-to-end coverage of the core services running on SQLCipher.
//!
//! Each test opens an isolated encrypted database with migrations applied
//! and drives the real `pocket-core` services through the infra
//! repositories, with a `MockClock` for deterministic time.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use pocket_common::{Clock, MockClock};
use pocket_core::{
    AuditTrail, KeyValueStore, ProfileStore, SystemKeyRotator, UserDataService, ViolationPolicy,
};
use pocket_domain::constants::SYSTEM_KEY_PIN_LENGTH;
use pocket_domain::keys::profile_key;
use pocket_domain::{
    ActivityAction, Config, KeyStatus, Note, PocketError, UserProfile, VerificationStatus,
};
use pocket_infra::database::{
    DbManager, SqlCipherActivityLogRepository, SqlCipherFailedLoginRepository,
    SqlCipherKeyValueStore, SqlCipherSystemConfigRepository,
};
use tempfile::TempDir;

const TEST_DB_KEY: &str = "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

struct DbHarness {
    temp_dir: TempDir,
    clock: MockClock,
    config: Config,
    kv: Arc<SqlCipherKeyValueStore>,
    audit: AuditTrail,
    profiles: ProfileStore,
    policy: Arc<ViolationPolicy>,
    rotator: SystemKeyRotator,
    data: UserDataService,
}

impl DbHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        Self::open(temp_dir)
    }

    fn open(temp_dir: TempDir) -> Self {
        let db_path = temp_dir.path().join("infra-integration.db");
        let manager = Arc::new(
            DbManager::new(&db_path, 4, Some(TEST_DB_KEY))
                .expect("database manager should initialise"),
        );
        manager.run_migrations().expect("schema migrations should apply");

        let config = Config::default();
        let clock = MockClock::at(Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap());
        let dyn_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let retries = config.security.update_retries;

        let kv = Arc::new(SqlCipherKeyValueStore::new(Arc::clone(&manager)));
        let audit = AuditTrail::new(
            Arc::new(SqlCipherActivityLogRepository::new(Arc::clone(&manager))),
            dyn_clock.clone(),
        );
        let profiles = ProfileStore::new(kv.clone(), retries);
        let policy = Arc::new(ViolationPolicy::new(
            profiles.clone(),
            Arc::new(SqlCipherFailedLoginRepository::new(Arc::clone(&manager))),
            audit.clone(),
            dyn_clock.clone(),
            config.security.max_failed_logins,
        ));
        let rotator = SystemKeyRotator::new(
            Arc::new(SqlCipherSystemConfigRepository::new(Arc::clone(&manager))),
            audit.clone(),
            dyn_clock.clone(),
            &config.key_rotation,
        );
        let data = UserDataService::new(kv.clone(), dyn_clock, retries);

        Self { temp_dir, clock, config, kv, audit, profiles, policy, rotator, data }
    }

    async fn seed_profile(&self, username: &str, violation_count: u32) -> UserProfile {
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
        self.profiles.create(&profile).await.expect("profile should be created");
        profile
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn final_violation_locks_the_profile_down() {
    let harness = DbHarness::new();
    harness.seed_profile("alice", 2).await;

    let outcome = harness
        .policy
        .record_violation("alice", "Invalid vault PIN")
        .await
        .expect("violation should be recorded")
        .expect("profile exists");
    assert!(outcome.locked_down);

    let profile = harness.profiles.require("alice").await.unwrap();
    assert!(profile.is_banned);
    assert_eq!(profile.level, 0);
    assert_eq!(profile.verification_status, VerificationStatus::Unverified);
    assert_eq!(profile.violation_count, 3);

    let log = harness.audit.for_user("alice", 10).await.unwrap();
    assert_eq!(log[0].action, ActivityAction::SecurityLockdown);
}

#[tokio::test(flavor = "multi_thread")]
async fn three_failed_logins_ban_a_profile_backed_user() {
    let harness = DbHarness::new();
    harness.seed_profile("bob", 0).await;

    let mut last = 0;
    for _ in 0..3 {
        last = harness.policy.record_failed_login("bob").await.unwrap();
    }

    assert_eq!(last, 3);
    assert!(harness.profiles.require("bob").await.unwrap().is_banned);
}

#[tokio::test(flavor = "multi_thread")]
async fn deleted_profile_is_not_recreated_by_violations() {
    let harness = DbHarness::new();
    harness.seed_profile("carol", 0).await;

    assert!(harness.kv.delete(&profile_key("carol")).await.unwrap());
    assert!(harness.kv.get(&profile_key("carol")).await.unwrap().is_none());

    let outcome = harness.policy.record_violation("carol", "probe").await.unwrap();
    assert!(outcome.is_none());
    assert!(harness.kv.get(&profile_key("carol")).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_violations_are_not_lost() {
    let harness = DbHarness::new();
    let mut profile = harness.seed_profile("dave", 0).await;
    profile.max_violations = 10;
    harness.kv.set(&profile_key("dave"), serde_json::to_value(&profile).unwrap()).await.unwrap();

    let policy = Arc::clone(&harness.policy);
    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let policy = Arc::clone(&policy);
            tokio::spawn(async move { policy.record_violation("dave", &format!("strike {i}")).await })
        })
        .collect();

    for task in tasks {
        match task.await.expect("task should join") {
            Ok(_) | Err(PocketError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let stored = harness.profiles.require("dave").await.unwrap();
    let successes = harness
        .audit
        .for_user("dave", 10)
        .await
        .unwrap()
        .into_iter()
        .filter(|entry| entry.action == ActivityAction::SecurityViolation)
        .count();
    assert_eq!(stored.violation_count as usize, successes);
    assert!(!stored.is_banned);
}

#[tokio::test(flavor = "multi_thread")]
async fn system_key_state_survives_reopen_and_rotates() {
    let harness = DbHarness::new();

    let first = harness.rotator.current_state().await.unwrap();
    assert_eq!(first.status, KeyStatus::Active);
    assert_eq!(first.pin.len(), SYSTEM_KEY_PIN_LENGTH);
    let codes = first.codes.clone().expect("active state has codes");
    for code in codes.iter() {
        assert!(harness.rotator.validate(code).await.unwrap());
    }

    harness.clock.advance_secs(300);
    let cooldown = harness.rotator.current_state().await.unwrap();
    assert_eq!(cooldown.status, KeyStatus::Cooldown);
    assert!(cooldown.codes.is_none());

    let DbHarness { temp_dir, clock, .. } = harness;
    let reopened = DbHarness::open(temp_dir);
    reopened.clock.set(clock.now());
    assert_eq!(reopened.rotator.current_state().await.unwrap(), cooldown);

    reopened.clock.advance_secs(60);
    let next = reopened.rotator.current_state().await.unwrap();
    assert_eq!(next.status, KeyStatus::Active);
    assert_ne!(next.pin, first.pin);
}

#[tokio::test(flavor = "multi_thread")]
async fn feature_collections_persist_per_user() {
    let harness = DbHarness::new();

    let note = harness.data.add("erin", Note::new("Exam", "Chapter 4")).await.unwrap();
    harness.data.add("frank", Note::new("Lab", "Bring goggles")).await.unwrap();

    let erin_notes: Vec<Note> = harness.data.list("erin").await.unwrap();
    assert_eq!(erin_notes, vec![note.clone()]);

    let removed: Option<Note> = harness.data.remove("erin", note.id).await.unwrap();
    assert_eq!(removed.map(|n| n.id), Some(note.id));
    assert!(harness.data.list::<Note>("erin").await.unwrap().is_empty());
    assert_eq!(harness.data.list::<Note>("frank").await.unwrap().len(), 1);
}
