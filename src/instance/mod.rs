//! # Instance Management
//!
//! Maps logical database names to files and worker containers, and drives
//! the container lifecycle through the [`ContainerRuntime`] capability.

pub mod docker;
pub mod lifecycle;
pub mod memory;
pub mod naming;
pub mod runtime;

pub use docker::DockerCli;
pub use lifecycle::{InstanceInfo, LifecycleManager, SpawnOutcome, WorkerSettings};
pub use memory::InMemoryRuntime;
pub use naming::{validate_db_name, worker_name, ResourceLocator};
pub use runtime::{
    ContainerRuntime, ContainerStatus, ContainerSummary, CreateSpec, RestartPolicy, RuntimeError,
    RuntimeResult,
};
