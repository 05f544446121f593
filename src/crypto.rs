//! Credential hashing logic.
//!
//! Credentials are never persisted in clear form: they are hashed with
//! Argon2id into PHC strings at registration and seeding, and verified
//! against the stored PHC at login.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    /// Hash password using Argon2id.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        );
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(password.as_ref(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify password against a PHC. A malformed PHC counts as a mismatch.
    pub fn verify_password(
        &self,
        password: impl AsRef<[u8]>,
        phc_hash: &str,
    ) -> bool {
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        );

        let Ok(parsed) = PasswordHash::new(phc_hash) else {
            return false;
        };

        argon2.verify_password(password.as_ref(), &parsed).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PasswordManager {
        PasswordManager::new(Some(ArgonConfig {
            memory_cost: 8,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let pwd = manager();
        let phc = pwd.hash_password("P$soW%920$n&").unwrap();

        assert!(phc.starts_with("$argon2id$"));
        assert!(pwd.verify_password("P$soW%920$n&", &phc));
        assert!(!pwd.verify_password("wrong", &phc));
    }

    #[test]
    fn test_malformed_phc_is_mismatch() {
        let pwd = manager();
        assert!(!pwd.verify_password("secret", "not-a-phc-string"));
    }

    #[test]
    fn test_salted_hashes_differ() {
        let pwd = manager();
        let a = pwd.hash_password("same-password").unwrap();
        let b = pwd.hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }
}
