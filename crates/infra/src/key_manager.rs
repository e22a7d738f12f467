//! Database encryption key management using the system keyring
use keyring::Entry;
use pocket_domain::Result;
use rand::RngCore;
use tracing::{info, warn};

use crate::errors::InfraError;

const SERVICE_NAME: &str = "edu.studentpocket.app";
const KEY_NAME: &str = "database_encryption_key";
const KEY_BYTES: usize = 32;

/// Manages the per-device SQLCipher key in the system keyring
pub struct KeyManager;

impl KeyManager {
    /// Return the stored key, generating and storing one on first use.
    pub fn get_or_create_key() -> Result<String> {
        let entry = Self::entry()?;

        match entry.get_password() {
            Ok(key) => Ok(key),
            Err(keyring::Error::NoEntry) => {
                let key = Self::generate_key();
                entry.set_password(&key).map_err(InfraError::from)?;
                info!("generated new database encryption key");
                Ok(key)
            }
            Err(err) => {
                warn!(error = %err, "keyring lookup failed");
                Err(InfraError::from(err).into())
            }
        }
    }

    /// Generate a new random key: 32 bytes, hex encoded
    pub fn generate_key() -> String {
        let mut bytes = [0u8; KEY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Delete the stored key. The database becomes unreadable without it.
    pub fn delete_key() -> Result<()> {
        Self::entry()?.delete_credential().map_err(InfraError::from)?;
        Ok(())
    }

    fn entry() -> Result<Entry> {
        Ok(Entry::new(SERVICE_NAME, KEY_NAME).map_err(InfraError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_64_hex_chars_and_unique() {
        let first = KeyManager::generate_key();
        let second = KeyManager::generate_key();

        assert_eq!(first.len(), KEY_BYTES * 2);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
