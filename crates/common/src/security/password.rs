//! Salted password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$...`), which embed the
//! salt and parameters, so verification needs nothing but the stored hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use tracing::warn;

use super::SecureString;
use crate::error::{CommonError, CommonResult};

/// Argon2id password hasher.
#[derive(Default, Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").field("algorithm", &"argon2id").finish()
    }
}

impl PasswordHasher {
    /// Hasher with the Argon2id defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Argon2id with explicit cost parameters (memory in KiB).
    ///
    /// Verification always uses the parameters embedded in the stored hash,
    /// so hashes made with different costs stay verifiable.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> CommonResult<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| CommonError::config(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self { argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params) })
    }

    /// Hash a secret into a PHC string with a fresh random salt.
    pub fn hash(&self, secret: &SecureString) -> CommonResult<String> {
        let salt = SaltString::generate(OsRng);
        self.argon2
            .hash_password(secret.expose().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CommonError::internal_with_context(e.to_string(), "password_hash"))
    }

    /// Verify a secret against a stored PHC string.
    ///
    /// A malformed stored hash verifies as `false` (and is logged) rather
    /// than erroring, so a corrupted record can never authenticate.
    pub fn verify(&self, secret: &SecureString, stored: &str) -> bool {
        let parsed = match PasswordHash::new(stored) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };

        self.argon2.verify_password(secret.expose().as_bytes(), &parsed).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = PasswordHasher::new();
        let secret = SecureString::new("correct horse battery staple");

        let hash = hasher.hash(&secret).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(&secret, &hash));
        assert!(!hasher.verify(&SecureString::new("wrong"), &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = PasswordHasher::new();
        let secret = SecureString::new("password123");

        let first = hasher.hash(&secret).unwrap();
        let second = hasher.hash(&secret).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn cheap_params_still_verify_with_default_hasher() {
        let cheap = PasswordHasher::with_params(8, 1, 1).unwrap();
        let secret = SecureString::new("password123");
        let hash = cheap.hash(&secret).unwrap();

        assert!(PasswordHasher::new().verify(&secret, &hash));
        assert!(PasswordHasher::with_params(0, 0, 0).is_err());
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let hasher = PasswordHasher::new();
        assert!(!hasher.verify(&SecureString::new("password123"), "plaintext-password"));
    }
}
