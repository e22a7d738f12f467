//! Typed access to `user:<username>:profile`.

use std::sync::Arc;

use pocket_domain::constants::USER_KEY_PREFIX;
use pocket_domain::keys::{profile_key, username_from_profile_key};
use pocket_domain::{PocketError, Result, UserProfile};

use crate::kv::ports::KeyValueStore;
use crate::kv::{get_json, read_modify_write};

/// Profile persistence over the key-value store. Updates use
/// compare-and-set so concurrent writers retry instead of overwriting.
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
    max_attempts: u32,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>, max_attempts: u32) -> Self {
        Self { store, max_attempts }
    }

    pub async fn get(&self, username: &str) -> Result<Option<UserProfile>> {
        get_json(self.store.as_ref(), &profile_key(username)).await
    }

    /// Load a profile or fail with `NotFound`.
    pub async fn require(&self, username: &str) -> Result<UserProfile> {
        self.get(username)
            .await?
            .ok_or_else(|| PocketError::NotFound(format!("profile for '{username}'")))
    }

    /// Insert a new profile. `Conflict` if one already exists.
    pub async fn create(&self, profile: &UserProfile) -> Result<()> {
        let value = serde_json::to_value(profile)?;
        self.store
            .compare_and_set(&profile_key(&profile.username), None, value)
            .await
            .map(|_| ())
            .map_err(|err| match err {
                PocketError::Conflict(_) => {
                    PocketError::Conflict(format!("profile '{}' already exists", profile.username))
                }
                other => other,
            })
    }

    /// Apply `mutate` to the stored profile and write it back.
    ///
    /// Returns `None` without writing when the profile does not exist. An
    /// error from `mutate` aborts the update.
    pub async fn update<R, F>(&self, username: &str, mut mutate: F) -> Result<Option<(UserProfile, R)>>
    where
        R: Send,
        F: FnMut(&mut UserProfile) -> Result<R> + Send,
    {
        read_modify_write(self.store.as_ref(), &profile_key(username), self.max_attempts, |current| {
            let Some(mut profile) = current else {
                return Ok(None);
            };
            let output = mutate(&mut profile)?;
            Ok(Some((profile.clone(), (profile, output))))
        })
        .await
    }

    pub async fn delete(&self, username: &str) -> Result<bool> {
        self.store.delete(&profile_key(username)).await
    }

    /// Usernames that have a stored profile, sorted
    pub async fn usernames(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .store
            .keys_with_prefix(USER_KEY_PREFIX)
            .await?
            .iter()
            .filter_map(|key| username_from_profile_key(key).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }
}
