//! Port interfaces for failed-login counters

use async_trait::async_trait;
use pocket_domain::Result;

/// Per-username failed login counters, independent of profiles
#[async_trait]
pub trait FailedLoginRepository: Send + Sync {
    /// Atomically increment and return the new count.
    async fn increment(&self, username: &str) -> Result<u32>;

    async fn get(&self, username: &str) -> Result<u32>;

    async fn reset(&self, username: &str) -> Result<()>;
}
