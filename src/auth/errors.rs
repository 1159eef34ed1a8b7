//! # Auth Errors
//!
//! Error types for the API key gatekeeper.

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication errors
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // ==================
    // Request Errors
    // ==================
    /// Header absent or empty; carries the expected header name
    #[error("Missing API Key. Please provide a valid API key in the {0} header.")]
    MissingKey(String),

    /// Presented key does not verify against the loaded hash
    #[error("Invalid API Key.")]
    InvalidKey,

    // ==================
    // Server Errors
    // ==================
    /// No secret was loaded at startup
    #[error("Authentication is not properly configured on the server.")]
    NotConfigured,

    /// Secrets file could not be read or parsed
    #[error("Secrets file error: {0}")]
    SecretsFile(String),

    /// Argon2 hashing failed
    #[error("Internal error: key hashing failed")]
    HashingFailed,
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MissingKey(_) => 401,
            AuthError::InvalidKey => 401,

            AuthError::NotConfigured => 503,

            AuthError::SecretsFile(_) => 500,
            AuthError::HashingFailed => 500,
        }
    }

    /// Returns whether this error should be logged at warn level
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AuthError::MissingKey("X-API-Key".into()).status_code(), 401);
        assert_eq!(AuthError::InvalidKey.status_code(), 401);
        assert_eq!(AuthError::NotConfigured.status_code(), 503);
        assert_eq!(AuthError::HashingFailed.status_code(), 500);
    }

    #[test]
    fn test_missing_key_names_header() {
        let err = AuthError::MissingKey("X-Custom-Key".into());
        assert!(err.to_string().contains("X-Custom-Key header"));
        assert!(err.is_client_error());
    }
}
