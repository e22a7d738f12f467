//! Port interfaces for singleton system configuration records

use async_trait::async_trait;
use pocket_domain::{Result, SystemKeyState};

#[async_trait]
pub trait SystemConfigRepository: Send + Sync {
    async fn load_system_key(&self) -> Result<Option<SystemKeyState>>;

    async fn store_system_key(&self, state: &SystemKeyState) -> Result<()>;
}
