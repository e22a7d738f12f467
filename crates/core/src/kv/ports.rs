//! Port interfaces for the key-value store
//!
//! Values are JSON documents. Every write bumps a per-key version so callers
//! can detect concurrent modification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pocket_domain::Result;
use serde_json::Value;

/// A stored value together with its version
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedValue {
    pub value: Value,
    /// Starts at 1 and increments on every write
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Versioned JSON key-value persistence. Each call is its own transaction.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn get_versioned(&self, key: &str) -> Result<Option<VersionedValue>>;

    /// Unconditional upsert. Returns the new version.
    async fn set(&self, key: &str, value: Value) -> Result<u64>;

    /// Write only if the stored version equals `expected_version`
    /// (`None` means the key must not exist). Returns the new version or
    /// `PocketError::Conflict`.
    async fn compare_and_set(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: Value,
    ) -> Result<u64>;

    /// Returns whether the key existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete every key starting with `prefix`. Returns the number removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
