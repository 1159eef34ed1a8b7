//! # Gateway Errors
//!
//! The error taxonomy shared by the lifecycle manager, the query engine and
//! the HTTP layer. Every failure that reaches a client is one of these.

use thiserror::Error;

use crate::auth::AuthError;
use crate::instance::RuntimeError;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway errors
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Malformed name, malformed request body, row-shape mismatch
    #[error("{0}")]
    InvalidRequest(String),

    /// Unknown database or instance
    #[error("{0}")]
    NotFound(String),

    /// Missing or bad credential
    #[error("{0}")]
    Unauthorized(String),

    /// Statement rejected by the embedded engine
    #[error("SQL Error: {0}")]
    Sql(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Container runtime or auth store not reachable
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Anything outside the taxonomy
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Machine-readable error code for the wire body
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Sql(_) => "SQL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::Sql(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
            Self::ServiceUnavailable(_) => 503,
        }
    }

    /// Whether a caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }
}

impl From<RuntimeError> for GatewayError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Unavailable(msg) => {
                Self::ServiceUnavailable(format!("Container runtime not available: {}", msg))
            }
            RuntimeError::NotFound(name) => {
                Self::NotFound(format!("Container '{}' not found.", name))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotConfigured => Self::ServiceUnavailable(err.to_string()),
            AuthError::MissingKey(_) | AuthError::InvalidKey => Self::Unauthorized(err.to_string()),
            AuthError::HashingFailed | AuthError::SecretsFile(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sql(err.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for GatewayError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {}", err))
    }
}
