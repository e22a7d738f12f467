//! SQLCipher persistence for every core port

mod codec;
pub mod activity_log_repository;
pub mod credential_repository;
pub mod failed_login_repository;
pub mod kv_store_repository;
pub mod manager;
pub mod sqlcipher_pool;
pub mod support_repository;
pub mod system_config_repository;

pub use activity_log_repository::*;
pub use credential_repository::*;
pub use failed_login_repository::*;
pub use kv_store_repository::*;
pub use manager::*;
pub use sqlcipher_pool::*;
pub use support_repository::*;
pub use system_config_repository::*;
