#![allow(dead_code)]

use std::path::Path;

use chrono::{TimeZone, Utc};
use pocket_common::{MockClock, PasswordHasher, SecureString};
use pocket_core::RegistrationRequest;
use pocket_domain::{Config, DatabaseConfig, Role, SeedAccount};
use pocket_lib::commands::{self, LoginResponse};
use pocket_lib::{AppContext, ContextOptions};
use tempfile::TempDir;

pub const TEST_KEY: &str = "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const ADMIN: &str = "registrar";
pub const ADMIN_PASSWORD: &str = "admin-pass-123";
pub const PASSWORD: &str = "correct horse";

/// Application context over a throwaway encrypted database.
pub struct TestApp {
    pub ctx: AppContext,
    pub clock: MockClock,
    pub temp_dir: TempDir,
}

pub fn test_config(db_path: &Path) -> Config {
    Config {
        database: DatabaseConfig {
            path: db_path.to_string_lossy().to_string(),
            pool_size: 4,
            encryption_key: Some(TEST_KEY.to_string()),
        },
        seed_accounts: vec![SeedAccount {
            username: ADMIN.into(),
            password: ADMIN_PASSWORD.into(),
            role: Role::Admin,
            name: "Registrar".into(),
            email: "registrar@uni.edu".into(),
            phone: String::new(),
        }],
        ..Config::default()
    }
}

pub fn test_options(clock: &MockClock) -> ContextOptions {
    ContextOptions {
        clock: std::sync::Arc::new(clock.clone()),
        hasher: PasswordHasher::with_params(8, 1, 1).expect("cheap argon2 params are valid"),
    }
}

pub fn start_clock() -> MockClock {
    MockClock::at(Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap())
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        let mut config = test_config(&temp_dir.path().join("pocket.db"));
        adjust(&mut config);
        let clock = start_clock();
        let ctx = AppContext::new_with_options(config, test_options(&clock))
            .await
            .expect("application context should initialise");
        Self { ctx, clock, temp_dir }
    }

    pub async fn register(&self, username: &str) {
        commands::register(
            &self.ctx,
            RegistrationRequest {
                username: username.into(),
                password: SecureString::new(PASSWORD),
                name: username.to_uppercase(),
                email: format!("{username}@uni.edu"),
                phone: None,
            },
        )
        .await
        .expect("registration should succeed");
    }

    pub async fn login(&self, username: &str) -> LoginResponse {
        commands::login(&self.ctx, username, &SecureString::new(PASSWORD))
            .await
            .expect("login should succeed")
    }

    pub async fn login_admin(&self) -> LoginResponse {
        commands::login(&self.ctx, ADMIN, &SecureString::new(ADMIN_PASSWORD))
            .await
            .expect("admin login should succeed")
    }
}
