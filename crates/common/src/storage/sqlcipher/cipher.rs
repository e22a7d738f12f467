//! SQLCipher key and cipher pragmas.

use rusqlite::Connection;
use tracing::{debug, error};

use crate::security::SecureString;
use crate::storage::error::{StorageError, StorageResult};

/// SQLCipher configuration
#[derive(Clone)]
pub struct SqlCipherConfig {
    /// Encryption key (zeroized on drop)
    pub key: SecureString,

    /// Cipher compatibility version (default: 4 for SQLCipher 4.x)
    pub cipher_compatibility: i32,

    /// KDF iterations for key derivation (default: 256000)
    pub kdf_iter: i32,
}

impl std::fmt::Debug for SqlCipherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlCipherConfig")
            .field("key", &self.key)
            .field("cipher_compatibility", &self.cipher_compatibility)
            .field("kdf_iter", &self.kdf_iter)
            .finish()
    }
}

impl SqlCipherConfig {
    /// Create default configuration with the given key
    pub fn new(key: SecureString) -> Self {
        Self { key, cipher_compatibility: 4, kdf_iter: 256_000 }
    }

    /// Set KDF iterations
    pub fn with_kdf_iter(mut self, iterations: i32) -> Self {
        self.kdf_iter = iterations;
        self
    }
}

/// Messages SQLite/SQLCipher produce when the key does not match the file.
pub(crate) fn looks_like_wrong_key(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("file is not a database")
        || lower.contains("file is encrypted")
        || lower.contains("database disk image is malformed")
        || lower.contains("notadb")
}

/// Apply the encryption pragmas to a freshly opened connection.
///
/// `PRAGMA key` must be the first statement executed on the connection.
pub fn configure_sqlcipher(conn: &Connection, config: &SqlCipherConfig) -> StorageResult<()> {
    conn.pragma_update(None, "key", config.key.expose()).map_err(|e| {
        error!(error = %e, "SQLCipher key setup failed");
        if looks_like_wrong_key(&e.to_string()) {
            StorageError::WrongKeyOrNotEncrypted
        } else {
            StorageError::Encryption(format!("Failed to set encryption key: {e}"))
        }
    })?;

    conn.pragma_update(None, "cipher_compatibility", config.cipher_compatibility).map_err(|e| {
        StorageError::Encryption(format!("Failed to set cipher_compatibility: {e}"))
    })?;

    conn.pragma_update(None, "kdf_iter", config.kdf_iter)
        .map_err(|e| StorageError::Encryption(format!("Failed to set kdf_iter: {e}")))?;

    debug!("SQLCipher configuration applied");
    Ok(())
}

/// Force SQLCipher to decrypt the header and schema pages.
///
/// Returns `WrongKeyOrNotEncrypted` when the key does not open the file.
pub fn verify_encryption(conn: &Connection) -> StorageResult<()> {
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(())).map_err(|e| {
        let message = e.to_string();
        if looks_like_wrong_key(&message) || message.to_lowercase().contains("unsupported file format")
        {
            error!("encryption verification failed: key rejected");
            StorageError::WrongKeyOrNotEncrypted
        } else {
            StorageError::from(e)
        }
    })
}
