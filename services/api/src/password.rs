//! Password hashing with Argon2

use anyhow::Result;
use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher as _, SaltString},
};

/// Hashes and verifies user passwords
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing string
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Check `plaintext` against a stored hash; `Ok(false)` on mismatch
    fn verify(&self, hash: &str, plaintext: &str) -> Result<bool>;
}

/// Argon2id hasher with default parameters
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, hash: &str, plaintext: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

        Ok(Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("correct horse").unwrap();

        assert_ne!(hash, "correct horse");
        assert!(hasher.verify(&hash, "correct horse").unwrap());
        assert!(!hasher.verify(&hash, "battery staple").unwrap());
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let hasher = Argon2Hasher;
        assert_ne!(hasher.hash("password1").unwrap(), hasher.hash("password1").unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(Argon2Hasher.verify("not-a-phc-string", "whatever").is_err());
    }
}
