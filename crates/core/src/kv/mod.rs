//! Key-value store port and optimistic read-modify-write.

pub mod ports;

use pocket_domain::{PocketError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use self::ports::KeyValueStore;

/// Read `key`, let `apply` compute the replacement, and write it back with
/// compare-and-set. A version conflict re-reads and re-applies, up to
/// `max_attempts` times.
///
/// `apply` receives `None` when the key is absent and returns `None` to
/// leave the store untouched.
pub async fn read_modify_write<T, R, F>(
    store: &dyn KeyValueStore,
    key: &str,
    max_attempts: u32,
    mut apply: F,
) -> Result<Option<R>>
where
    T: Serialize + DeserializeOwned + Send,
    R: Send,
    F: FnMut(Option<T>) -> Result<Option<(T, R)>> + Send,
{
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        let current = store.get_versioned(key).await?;
        let (value, version) = match current {
            Some(versioned) => {
                (Some(serde_json::from_value::<T>(versioned.value)?), Some(versioned.version))
            }
            None => (None, None),
        };

        let Some((next, output)) = apply(value)? else {
            return Ok(None);
        };
        let encoded = serde_json::to_value(&next)?;

        match store.compare_and_set(key, version, encoded).await {
            Ok(_) => return Ok(Some(output)),
            Err(PocketError::Conflict(reason)) => {
                debug!(key, attempt, %reason, "version conflict, retrying");
            }
            Err(other) => return Err(other),
        }
    }

    Err(PocketError::Conflict(format!("{key} changed concurrently {attempts} times")))
}

/// Read and decode a JSON value.
pub async fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    store.get(key).await?.map(serde_json::from_value).transpose().map_err(PocketError::from)
}
