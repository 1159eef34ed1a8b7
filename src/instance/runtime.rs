//! # Container Runtime Capability
//!
//! The lifecycle manager only talks to containers through this trait.
//! Implementations: [`DockerCli`](super::DockerCli) for a real daemon and
//! [`InMemoryRuntime`](super::InMemoryRuntime) for tests and local runs.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Label marking a container as a managed worker
pub const WORKER_LABEL: &str = "db-worker";

/// Label carrying the logical database name
pub const NAME_LABEL: &str = "db-name";

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by a container runtime
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// The runtime cannot be reached at all
    #[error("{0}")]
    Unavailable(String),

    /// No container with this name or ID
    #[error("no such container: {0}")]
    NotFound(String),

    /// A container with this name already exists
    #[error("container name already in use: {0}")]
    Conflict(String),

    /// The runtime answered with something we could not understand
    #[error("unexpected runtime response: {0}")]
    Protocol(String),

    /// The runtime rejected the operation
    #[error("runtime operation failed: {0}")]
    Failed(String),
}

/// Coarse container state as reported by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Exited,
    Created,
    Paused,
    Restarting,
    Removing,
    Dead,
    /// Any state string the runtime reports that we do not model
    Other(String),
}

impl ContainerStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "exited" => Self::Exited,
            "created" => Self::Created,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "removing" => Self::Removing,
            "dead" => Self::Dead,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Exited => "exited",
            Self::Created => "created",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
            Self::Removing => "removing",
            Self::Dead => "dead",
            Self::Other(s) => s,
        }
    }
}

impl Serialize for ContainerStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the runtime tells us about one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub status: ContainerStatus,
    pub labels: BTreeMap<String, String>,
}

impl ContainerSummary {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Restart policy requested at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    No,
    UnlessStopped,
    Always,
}

impl RestartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::No => "no",
            Self::UnlessStopped => "unless-stopped",
            Self::Always => "always",
        }
    }
}

/// Everything needed to create and start a detached worker container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSpec {
    pub image: String,
    pub name: String,
    pub hostname: String,
    pub network: String,
    pub labels: BTreeMap<String, String>,
    pub restart_policy: RestartPolicy,
}

/// Capability interface over a container runtime.
///
/// `create` must be atomic by name: a second create for a name that exists
/// returns [`RuntimeError::Conflict`], never a different error.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Look up one container by name. `Ok(None)` when it does not exist.
    async fn inspect(&self, name: &str) -> RuntimeResult<Option<ContainerSummary>>;

    /// Create and start a detached container, returning its ID.
    async fn create(&self, spec: &CreateSpec) -> RuntimeResult<String>;

    async fn start(&self, id: &str) -> RuntimeResult<()>;

    /// Resume a paused container. `start` does not apply to paused ones.
    async fn unpause(&self, id: &str) -> RuntimeResult<()>;

    async fn stop(&self, id: &str) -> RuntimeResult<()>;

    async fn remove(&self, id: &str) -> RuntimeResult<()>;

    /// All containers (running or not) carrying `key=value`.
    async fn list_by_label(&self, key: &str, value: &str) -> RuntimeResult<Vec<ContainerSummary>>;
}
