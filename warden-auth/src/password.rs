//! Password hashing primitives
//!
//! Credential storage treats password verification as an opaque primitive;
//! everything else in the crate only sees `verify(user, password) -> bool`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use warden_core::{ErrorContext, WardenError, WardenResult};

/// Hash a password using Argon2 with a fresh salt
pub fn hash_password(password: &str) -> WardenResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| WardenError::Internal {
            message: format!("Password hashing failed: {}", e),
            source: None,
            context: ErrorContext::new("password"),
        })
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> WardenResult<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| WardenError::Internal {
        message: format!("Stored password hash is malformed: {}", e),
        source: None,
        context: ErrorContext::new("password"),
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("secret123").unwrap();
        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("secret123", "not-a-phc-string").is_err());
    }
}
