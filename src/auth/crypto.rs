//! # Cryptographic Utilities
//!
//! API key hashing and generation.
//!
//! Keys are only ever stored as Argon2id PHC strings; verification goes
//! through the argon2 crate, which compares in constant time.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::RngCore;

use super::errors::{AuthError, AuthResult};

/// Hash an API key using Argon2id
pub fn hash_api_key(key: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(key.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::HashingFailed)
}

/// Check that a stored hash is a well-formed PHC string.
pub fn check_hash_format(hash: &str) -> AuthResult<()> {
    PasswordHash::new(hash)
        .map(|_| ())
        .map_err(|e| AuthError::SecretsFile(format!("malformed key hash: {}", e)))
}

/// Verify an API key against its hash
pub fn verify_api_key(key: &str, hash: &str) -> AuthResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::SecretsFile(format!("malformed key hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(key.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate a random 256-bit API key, URL-safe base64 without padding.
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_hash_and_verify() {
        let key = "admin-key-123";
        let hash = hash_api_key(key).unwrap();

        assert_ne!(hash, key);
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_api_key(key, &hash).unwrap());
        assert!(!verify_api_key("wrong-key", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hash1 = hash_api_key("same").unwrap();
        let hash2 = hash_api_key("same").unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_api_key("same", &hash1).unwrap());
        assert!(verify_api_key("same", &hash2).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_rejected() {
        assert!(check_hash_format("not-a-phc-string").is_err());
        assert!(verify_api_key("key", "plaintext").is_err());
    }

    #[test]
    fn test_generated_keys() {
        let key1 = generate_api_key();
        let key2 = generate_api_key();

        assert_ne!(key1, key2);
        // 32 bytes, unpadded base64
        assert_eq!(key1.len(), 43);
        assert!(!key1.contains('='));
    }
}
