//! Argon2-based implementation of `PasswordHasher`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use domains::{DomainError, DomainResult, PasswordHasher};

/// Argon2id with the crate's default parameters. Hashes are PHC strings,
/// so parameters can change later without invalidating stored hashes.
#[derive(Debug, Default, Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> DomainResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| DomainError::internal(format!("password hashing failed: {e}")))
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is not a PHC string");
                return false;
            }
        };
        self.argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash("correct horse battery staple").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("correct horse battery staple", &hash));
        assert!(!hasher.verify("wrong", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!Argon2PasswordHasher::new().verify("anything", "not-a-hash"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = Argon2PasswordHasher::new();
        assert_ne!(hasher.hash("pw12345678").unwrap(), hasher.hash("pw12345678").unwrap());
    }
}
