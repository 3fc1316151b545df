//! Pluggable password hashing.
//!
//! The storage algorithm is deliberately swappable: everything above this
//! trait only ever sees opaque hash strings.  [`Argon2Hasher`] is the
//! production implementation (Argon2id with the library defaults).

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{CoreError, Result};

/// Hashing seam between the account lifecycle and the credential store.
pub trait CredentialHasher: Send + Sync {
    /// Produce a self-describing hash string for the password.
    fn hash(&self, password: &str) -> Result<String>;

    /// Check a password against a stored hash.  Any parse failure of the
    /// stored value counts as a mismatch.
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// Argon2id with default parameters and a fresh random salt per hash.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CoreError::Credential(e.to_string()))
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
