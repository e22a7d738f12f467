//! Generic CRUD over feature collections.

use std::sync::Arc;

use pocket_common::Clock;
use pocket_domain::keys::feature_key;
use pocket_domain::{FeatureCollection, FeatureRecord, PocketError, Result};
use tracing::debug;
use uuid::Uuid;

use crate::kv::ports::KeyValueStore;
use crate::kv::{get_json, read_modify_write};

/// Reads and writes `user:<username>:<feature>` collections.
///
/// Each feature is an independent key, so writes to notes never race with
/// writes to grades. Writes to the same feature retry on version conflicts.
#[derive(Clone)]
pub struct UserDataService {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl UserDataService {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, max_attempts: u32) -> Self {
        Self { store, clock, max_attempts }
    }

    pub async fn list<T: FeatureRecord>(&self, username: &str) -> Result<Vec<T>> {
        let collection: Option<FeatureCollection<T>> =
            get_json(self.store.as_ref(), &feature_key(username, T::FEATURE)).await?;
        Ok(collection.map(|c| c.items).unwrap_or_default())
    }

    pub async fn get<T: FeatureRecord>(&self, username: &str, id: Uuid) -> Result<Option<T>> {
        Ok(self.list::<T>(username).await?.into_iter().find(|item| item.id() == id))
    }

    /// Append `record`, stamping its timestamps. `Conflict` if the id exists.
    pub async fn add<T: FeatureRecord>(&self, username: &str, mut record: T) -> Result<T> {
        record.mark_created(self.clock.now());
        let id = record.id();
        let stored = record.clone();

        self.modify::<T, _, _>(username, move |collection| {
            if collection.find(id).is_some() {
                return Err(PocketError::Conflict(format!("{} record {id} already exists", T::FEATURE)));
            }
            collection.items.push(stored.clone());
            Ok(())
        })
        .await?;

        debug!(username, feature = T::FEATURE.as_str(), %id, "record added");
        Ok(record)
    }

    /// Replace the record with the same id. `NotFound` if absent.
    pub async fn update<T: FeatureRecord>(&self, username: &str, mut record: T) -> Result<T> {
        record.touch(self.clock.now());
        let id = record.id();
        let replacement = record;

        self.modify::<T, _, _>(username, move |collection| {
            let index = collection
                .position(id)
                .ok_or_else(|| PocketError::NotFound(format!("{} record {id}", T::FEATURE)))?;
            let mut next = replacement.clone();
            // created_at is owned by the store, not the caller
            next.set_created_at(collection.items[index].created_at());
            collection.items[index] = next.clone();
            Ok(next)
        })
        .await
    }

    /// Remove and return the record with `id`, if present.
    pub async fn remove<T: FeatureRecord>(&self, username: &str, id: Uuid) -> Result<Option<T>> {
        self.modify::<T, _, _>(username, move |collection| {
            Ok(collection.position(id).map(|index| collection.items.remove(index)))
        })
        .await
    }

    /// Delete the whole feature collection. Returns whether it existed.
    pub async fn clear<T: FeatureRecord>(&self, username: &str) -> Result<bool> {
        self.store.delete(&feature_key(username, T::FEATURE)).await
    }

    async fn modify<T, R, F>(&self, username: &str, mut apply: F) -> Result<R>
    where
        T: FeatureRecord,
        R: Send,
        F: FnMut(&mut FeatureCollection<T>) -> Result<R> + Send,
    {
        let key = feature_key(username, T::FEATURE);
        let output = read_modify_write(self.store.as_ref(), &key, self.max_attempts, |current| {
            let mut collection: FeatureCollection<T> = current.unwrap_or_default();
            let output = apply(&mut collection)?;
            Ok(Some((collection, output)))
        })
        .await?;

        output.ok_or_else(|| PocketError::Internal(format!("update of {key} produced no result")))
    }
}
