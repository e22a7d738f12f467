//! Failed-login counters, kept apart from profiles

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pocket_core::FailedLoginRepository;
use pocket_domain::Result as DomainResult;
use rusqlite::params;
use tokio::task;

use super::codec::{count_to_u32, to_millis};
use super::manager::DbManager;
use crate::errors::{map_join_error, map_storage_error};

const INCREMENT: &str = "INSERT INTO failed_logins (username, count, last_failed_at) VALUES (?1, 1, ?2)
     ON CONFLICT(username) DO UPDATE SET
        count = failed_logins.count + 1,
        last_failed_at = excluded.last_failed_at
     RETURNING count";

pub struct SqlCipherFailedLoginRepository {
    db: Arc<DbManager>,
}

impl SqlCipherFailedLoginRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FailedLoginRepository for SqlCipherFailedLoginRepository {
    async fn increment(&self, username: &str) -> DomainResult<u32> {
        let db = Arc::clone(&self.db);
        let username = username.to_string();

        task::spawn_blocking(move || -> DomainResult<u32> {
            let conn = db.get_connection()?;
            conn.query_row(INCREMENT, params![&username, to_millis(Utc::now())], |row| {
                count_to_u32(0, row.get(0)?)
            })
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, username: &str) -> DomainResult<u32> {
        let db = Arc::clone(&self.db);
        let username = username.to_string();

        task::spawn_blocking(move || -> DomainResult<u32> {
            let conn = db.get_connection()?;
            let count = conn
                .query_optional(
                    "SELECT count FROM failed_logins WHERE username = ?1",
                    params![&username],
                    |row| count_to_u32(0, row.get(0)?),
                )
                .map_err(map_storage_error)?;
            Ok(count.unwrap_or(0))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn reset(&self, username: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let username = username.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute("DELETE FROM failed_logins WHERE username = ?1", params![&username])
                .map_err(map_storage_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const TEST_KEY: &str = "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    #[tokio::test(flavor = "multi_thread")]
    async fn counts_per_username_until_reset() {
        let temp_dir = TempDir::new().unwrap();
        let manager =
            DbManager::new(temp_dir.path().join("logins.db"), 2, Some(TEST_KEY)).expect("manager");
        manager.run_migrations().unwrap();
        let repo = SqlCipherFailedLoginRepository::new(Arc::new(manager));

        assert_eq!(repo.get("alice").await.unwrap(), 0);
        assert_eq!(repo.increment("alice").await.unwrap(), 1);
        assert_eq!(repo.increment("alice").await.unwrap(), 2);
        assert_eq!(repo.increment("bob").await.unwrap(), 1);
        assert_eq!(repo.get("alice").await.unwrap(), 2);

        repo.reset("alice").await.unwrap();
        assert_eq!(repo.get("alice").await.unwrap(), 0);
        assert_eq!(repo.get("bob").await.unwrap(), 1);
    }
}
