//! Gateway Configuration
//!
//! Bind address, CORS, worker container settings and the secrets file
//! location. Loaded from an optional JSON file; CLI flags override it.

use std::fs;
use std::path::{Path, PathBuf};

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration load/validation failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Directory holding the `<name>.db` files
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    /// Image every worker container runs
    #[serde(default = "default_worker_image")]
    pub worker_image: String,

    /// Network every worker container joins
    #[serde(default = "default_network")]
    pub network: String,

    /// JSON file holding the admin key hash
    #[serde(default = "default_secrets_path")]
    pub secrets_path: PathBuf,

    /// Request header carrying the API key
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Docker executable
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_data_root() -> PathBuf {
    PathBuf::from("/databases")
}

fn default_worker_image() -> String {
    "db-worker-base:latest".to_string()
}

fn default_network() -> String {
    "db-forge-net".to_string()
}

fn default_secrets_path() -> PathBuf {
    PathBuf::from("./secrets/admin.json")
}

fn default_api_key_header() -> String {
    crate::auth::DEFAULT_API_KEY_HEADER.to_string()
}

fn default_docker_bin() -> String {
    crate::instance::docker::DEFAULT_DOCKER_BIN.to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            data_root: default_data_root(),
            worker_image: default_worker_image(),
            network: default_network(),
            secrets_path: default_secrets_path(),
            api_key_header: default_api_key_header(),
            docker_bin: default_docker_bin(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        let config: GatewayConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be > 0".to_string()));
        }
        if self.worker_image.trim().is_empty() {
            return Err(ConfigError::Invalid("worker_image must not be empty".to_string()));
        }
        if self.network.trim().is_empty() {
            return Err(ConfigError::Invalid("network must not be empty".to_string()));
        }
        if HeaderName::from_bytes(self.api_key_header.as_bytes()).is_err() {
            return Err(ConfigError::Invalid(format!(
                "api_key_header is not a valid header name: '{}'",
                self.api_key_header
            )));
        }
        Ok(())
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
