//! SQLCipher pool helpers
//!
//! Thin wrapper around the shared SQLCipher connection pool that converts
//! storage errors into the domain error type used by infrastructure code.

use std::path::Path;
use std::sync::Arc;

use pocket_common::storage::sqlcipher::{
    SqlCipherPool as CommonSqlCipherPool, SqlCipherPoolConfig,
};
use pocket_common::SecureString;
use pocket_domain::Result as DomainResult;

use crate::errors::map_storage_error;

/// Re-export the common SQLCipher pool so callers can depend on the shared
/// type.
pub type SqlCipherPool = CommonSqlCipherPool;

/// Open the pool behind an `Arc`, mapping storage errors to `PocketError`.
pub fn create_sqlcipher_pool<P: AsRef<Path>>(
    path: P,
    encryption_key: SecureString,
    config: SqlCipherPoolConfig,
) -> DomainResult<Arc<SqlCipherPool>> {
    SqlCipherPool::new(path.as_ref(), encryption_key, config)
        .map(Arc::new)
        .map_err(map_storage_error)
}
