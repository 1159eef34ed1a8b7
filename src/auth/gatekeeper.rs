//! # API Key Gatekeeper
//!
//! Binary allow/deny for every protected route.
//!
//! The admin key hash is loaded once at startup and never rotated. A
//! gatekeeper without a hash refuses every request with 503 rather than
//! letting traffic through.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::crypto::{check_hash_format, verify_api_key};
use super::errors::{AuthError, AuthResult};

/// Default request header carrying the API key
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// On-disk shape of the secrets file
#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(alias = "api_key_hash")]
    password_hash: String,
}

/// Verifies presented API keys against the loaded admin hash
#[derive(Debug, Clone)]
pub struct AuthGatekeeper {
    header_name: String,
    key_hash: Option<Arc<str>>,
}

impl AuthGatekeeper {
    /// Gatekeeper with a known hash
    pub fn new(header_name: impl Into<String>, key_hash: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            key_hash: Some(Arc::from(key_hash.into())),
        }
    }

    /// Gatekeeper in the "configured absent" state
    pub fn unconfigured(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            key_hash: None,
        }
    }

    /// Load the hash from a secrets file. Any failure is logged and leaves
    /// the gatekeeper unconfigured.
    pub fn from_secrets_file(path: &Path, header_name: impl Into<String>) -> Self {
        let header_name = header_name.into();
        match load_key_hash(path) {
            Ok(hash) => {
                info!(path = %path.display(), "Loaded admin key hash");
                Self::new(header_name, hash)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Admin key hash not loaded; protected routes will answer 503"
                );
                Self::unconfigured(header_name)
            }
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn is_configured(&self) -> bool {
        self.key_hash.is_some()
    }

    /// Check a presented key. `None` and empty values count as missing.
    pub async fn verify(&self, presented: Option<&str>) -> AuthResult<()> {
        let hash = self.key_hash.clone().ok_or(AuthError::NotConfigured)?;

        let key = match presented {
            Some(k) if !k.is_empty() => k.to_string(),
            _ => return Err(AuthError::MissingKey(self.header_name.clone())),
        };

        // Argon2 is deliberately slow; keep it off the async workers.
        let verified = tokio::task::spawn_blocking(move || verify_api_key(&key, &hash))
            .await
            .map_err(|_| AuthError::HashingFailed)??;

        if verified {
            Ok(())
        } else {
            Err(AuthError::InvalidKey)
        }
    }
}

/// Read and validate the admin key hash from `path`.
pub fn load_key_hash(path: &Path) -> AuthResult<String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AuthError::SecretsFile(format!("{}: {}", path.display(), e)))?;
    let secrets: SecretsFile = serde_json::from_str(&raw)
        .map_err(|e| AuthError::SecretsFile(format!("{}: {}", path.display(), e)))?;

    check_hash_format(&secrets.password_hash)?;
    Ok(secrets.password_hash)
}
