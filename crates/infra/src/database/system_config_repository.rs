//! Singleton configuration records (system key state)

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pocket_core::SystemConfigRepository;
use pocket_domain::constants::SYSTEM_KEY_ID;
use pocket_domain::{Result as DomainResult, SystemKeyState};
use rusqlite::params;
use tokio::task;

use super::codec::{parse_json, to_millis};
use super::manager::DbManager;
use crate::errors::{map_join_error, map_storage_error};

const SELECT_VALUE: &str = "SELECT value FROM system_config WHERE key = ?1";

const UPSERT_VALUE: &str = "INSERT INTO system_config (key, value, updated_at) VALUES (?1, ?2, ?3)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

pub struct SqlCipherSystemConfigRepository {
    db: Arc<DbManager>,
}

impl SqlCipherSystemConfigRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SystemConfigRepository for SqlCipherSystemConfigRepository {
    async fn load_system_key(&self) -> DomainResult<Option<SystemKeyState>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<SystemKeyState>> {
            let conn = db.get_connection()?;
            conn.query_optional(SELECT_VALUE, params![SYSTEM_KEY_ID], |row| {
                let raw: String = row.get(0)?;
                parse_json(0, &raw)
            })
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn store_system_key(&self, state: &SystemKeyState) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let encoded = serde_json::to_string(state)?;

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(UPSERT_VALUE, params![SYSTEM_KEY_ID, &encoded, to_millis(Utc::now())])
                .map_err(map_storage_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;

    const TEST_KEY: &str = "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    #[tokio::test(flavor = "multi_thread")]
    async fn stores_and_replaces_the_singleton() {
        let temp_dir = TempDir::new().unwrap();
        let manager =
            DbManager::new(temp_dir.path().join("cfg.db"), 2, Some(TEST_KEY)).expect("manager");
        manager.run_migrations().unwrap();
        let repo = SqlCipherSystemConfigRepository::new(Arc::new(manager));

        assert!(repo.load_system_key().await.unwrap().is_none());

        let at = Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap();
        let active = SystemKeyState::active("123456", at);
        repo.store_system_key(&active).await.unwrap();
        assert_eq!(repo.load_system_key().await.unwrap(), Some(active));

        let cooldown = SystemKeyState::cooldown("123456", at + chrono::Duration::minutes(5));
        repo.store_system_key(&cooldown).await.unwrap();
        let loaded = repo.load_system_key().await.unwrap().unwrap();
        assert!(loaded.codes.is_none());
        assert_eq!(loaded, cooldown);
    }
}
