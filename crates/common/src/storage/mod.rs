//! Storage primitives for the encrypted local database
//!
//! SQLCipher-encrypted SQLite behind an r2d2 pool. Schemas are owned by the
//! application layer; this module only manages connections.

pub mod error;
pub mod metrics;
pub mod sqlcipher;
pub mod types;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use metrics::StorageMetrics;
pub use sqlcipher::{
    apply_connection_pragmas, SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig,
};
pub use types::{HealthStatus, PoolMetrics};
