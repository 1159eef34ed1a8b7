//! # Instance Lifecycle
//!
//! Idempotent spawn, prune and list of worker containers.
//!
//! State machine per database name:
//!
//! ```text
//! absent  --spawn--> running
//! exited  --spawn--> running   (existing container started)
//! running --spawn--> running   (no runtime mutation)
//! running|exited --prune--> absent
//! ```
//!
//! The backing `.db` file is created at first spawn and never deleted here,
//! so a pruned database can be brought back by spawning it again.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{GatewayError, GatewayResult};

use super::naming::{validate_db_name, ResourceLocator};
use super::runtime::{
    ContainerRuntime, ContainerStatus, ContainerSummary, CreateSpec, RestartPolicy, RuntimeError,
    NAME_LABEL, WORKER_LABEL,
};

/// Name reported for a worker container that lost its `db-name` label
pub const UNKNOWN_DB_NAME: &str = "unknown";

/// Settings applied to every worker container
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub image: String,
    pub network: String,
}

/// How a spawn call was satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// A new container was created
    Created { container_id: String },
    /// A stopped container existed and was started
    Restarted { container_id: String },
    /// A running container existed; nothing changed
    AlreadyRunning { container_id: String },
}

impl SpawnOutcome {
    pub fn container_id(&self) -> &str {
        match self {
            Self::Created { container_id }
            | Self::Restarted { container_id }
            | Self::AlreadyRunning { container_id } => container_id,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Created { .. } => "Database instance spawned successfully.",
            Self::Restarted { .. } => "Database instance already exists, now running.",
            Self::AlreadyRunning { .. } => "Database instance already exists and is running.",
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// One managed instance as reported by `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceInfo {
    pub name: String,
    pub container_id: String,
    pub status: ContainerStatus,
}

impl From<ContainerSummary> for InstanceInfo {
    fn from(c: ContainerSummary) -> Self {
        Self {
            name: c
                .label(NAME_LABEL)
                .unwrap_or(UNKNOWN_DB_NAME)
                .to_string(),
            container_id: c.id,
            status: c.status,
        }
    }
}

/// Spawns, prunes and lists isolated database instances.
pub struct LifecycleManager {
    runtime: Arc<dyn ContainerRuntime>,
    locator: ResourceLocator,
    worker: WorkerSettings,
}

impl LifecycleManager {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        locator: ResourceLocator,
        worker: WorkerSettings,
    ) -> Self {
        Self {
            runtime,
            locator,
            worker,
        }
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    /// Ensure an instance named `name` exists and is running.
    pub async fn spawn(&self, name: &str) -> GatewayResult<SpawnOutcome> {
        ensure_valid_name(name)?;
        let worker_name = self.locator.worker_name(name);

        if let Some(existing) = self.runtime.inspect(&worker_name).await? {
            return self.resume(name, existing).await;
        }

        self.touch_db_file(name)?;

        let spec = self.create_spec(name, &worker_name);
        match self.runtime.create(&spec).await {
            Ok(container_id) => {
                info!(db_name = %name, container_id = %container_id, "Spawned database instance");
                Ok(SpawnOutcome::Created { container_id })
            }
            Err(RuntimeError::Conflict(_)) => {
                // Lost a create race; the winner's container is ours too.
                warn!(db_name = %name, "Concurrent spawn detected, reusing existing container");
                let existing = self.runtime.inspect(&worker_name).await?.ok_or_else(|| {
                    GatewayError::internal(format!(
                        "container {} reported as existing but not found",
                        worker_name
                    ))
                })?;
                self.resume(name, existing).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stop and remove the instance's container. The data file stays.
    pub async fn prune(&self, name: &str) -> GatewayResult<()> {
        ensure_valid_name(name)?;
        let worker_name = self.locator.worker_name(name);

        let container = self
            .runtime
            .inspect(&worker_name)
            .await?
            .ok_or_else(|| GatewayError::not_found("Database instance not found."))?;

        self.runtime.stop(&container.id).await?;
        self.runtime.remove(&container.id).await?;

        info!(db_name = %name, container_id = %container.id, "Pruned database instance");
        Ok(())
    }

    /// Every worker container, running or stopped.
    pub async fn list(&self) -> GatewayResult<Vec<InstanceInfo>> {
        let containers = self.runtime.list_by_label(WORKER_LABEL, "true").await?;
        Ok(containers.into_iter().map(InstanceInfo::from).collect())
    }

    async fn resume(&self, name: &str, existing: ContainerSummary) -> GatewayResult<SpawnOutcome> {
        if existing.status == ContainerStatus::Running {
            return Ok(SpawnOutcome::AlreadyRunning {
                container_id: existing.id,
            });
        }

        if existing.status == ContainerStatus::Paused {
            self.runtime.unpause(&existing.id).await?;
        } else {
            self.runtime.start(&existing.id).await?;
        }
        info!(
            db_name = %name,
            container_id = %existing.id,
            previous_status = %existing.status,
            "Started existing database instance"
        );
        Ok(SpawnOutcome::Restarted {
            container_id: existing.id,
        })
    }

    /// Create the data file if missing; never truncates an existing one.
    fn touch_db_file(&self, name: &str) -> GatewayResult<()> {
        std::fs::create_dir_all(self.locator.data_root())?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.locator.db_path(name))?;
        Ok(())
    }

    fn create_spec(&self, name: &str, worker_name: &str) -> CreateSpec {
        let mut labels = BTreeMap::new();
        labels.insert(WORKER_LABEL.to_string(), "true".to_string());
        labels.insert(NAME_LABEL.to_string(), name.to_string());

        CreateSpec {
            image: self.worker.image.clone(),
            name: worker_name.to_string(),
            hostname: worker_name.to_string(),
            network: self.worker.network.clone(),
            labels,
            restart_policy: RestartPolicy::UnlessStopped,
        }
    }
}

fn ensure_valid_name(name: &str) -> GatewayResult<()> {
    if validate_db_name(name) {
        Ok(())
    } else {
        Err(GatewayError::invalid_request("Invalid database name."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::runtime::RuntimeResult;
    use crate::instance::InMemoryRuntime;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<InMemoryRuntime>, LifecycleManager) {
        let tmp = TempDir::new().unwrap();
        let runtime = Arc::new(InMemoryRuntime::new());
        let manager = LifecycleManager::new(
            runtime.clone(),
            ResourceLocator::new(tmp.path().join("databases")),
            WorkerSettings {
                image: "db-worker-base:latest".to_string(),
                network: "db-forge-net".to_string(),
            },
        );
        (tmp, runtime, manager)
    }

    #[tokio::test]
    async fn test_spawn_creates_file_and_container() {
        let (_tmp, runtime, manager) = setup();

        let outcome = manager.spawn("orders").await.unwrap();

        assert!(outcome.is_created());
        assert!(manager.locator().db_path("orders").exists());
        let container = runtime.inspect("db-worker-orders").await.unwrap().unwrap();
        assert_eq!(container.id, outcome.container_id());
        assert_eq!(container.label("db-name"), Some("orders"));
        assert_eq!(container.label("db-worker"), Some("true"));
    }

    #[tokio::test]
    async fn test_spawn_is_idempotent() {
        let (_tmp, runtime, manager) = setup();

        let first = manager.spawn("orders").await.unwrap();
        let second = manager.spawn("orders").await.unwrap();

        assert_eq!(first.container_id(), second.container_id());
        assert_eq!(
            second,
            SpawnOutcome::AlreadyRunning {
                container_id: first.container_id().to_string()
            }
        );
        assert_eq!(runtime.container_count(), 1);
        assert_eq!(runtime.operations().len(), 1);
    }

    #[tokio::test]
    async fn test_spawn_starts_exited_container() {
        let (_tmp, runtime, manager) = setup();
        let first = manager.spawn("orders").await.unwrap();
        runtime
            .set_status("db-worker-orders", ContainerStatus::Exited)
            .unwrap();

        let second = manager.spawn("orders").await.unwrap();

        assert!(matches!(second, SpawnOutcome::Restarted { .. }));
        assert_eq!(second.container_id(), first.container_id());
        let container = runtime.inspect("db-worker-orders").await.unwrap().unwrap();
        assert_eq!(container.status, ContainerStatus::Running);
    }

    #[tokio::test]
    async fn test_spawn_unpauses_paused_container() {
        let (_tmp, runtime, manager) = setup();
        let first = manager.spawn("orders").await.unwrap();
        runtime
            .set_status("db-worker-orders", ContainerStatus::Paused)
            .unwrap();

        let second = manager.spawn("orders").await.unwrap();

        assert!(matches!(second, SpawnOutcome::Restarted { .. }));
        assert_eq!(second.container_id(), first.container_id());
        let container = runtime.inspect("db-worker-orders").await.unwrap().unwrap();
        assert_eq!(container.status, ContainerStatus::Running);
        assert_eq!(
            runtime.operations().last().map(String::as_str),
            Some(format!("unpause {}", first.container_id()).as_str())
        );
    }

    /// Misses the next `inspect`, as if another spawn created the
    /// container between our lookup and our create.
    struct RacingRuntime {
        inner: Arc<InMemoryRuntime>,
        miss_next_inspect: AtomicBool,
    }

    #[async_trait]
    impl ContainerRuntime for RacingRuntime {
        async fn inspect(&self, name: &str) -> RuntimeResult<Option<ContainerSummary>> {
            if self.miss_next_inspect.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.inspect(name).await
        }

        async fn create(&self, spec: &CreateSpec) -> RuntimeResult<String> {
            self.inner.create(spec).await
        }

        async fn start(&self, id: &str) -> RuntimeResult<()> {
            self.inner.start(id).await
        }

        async fn unpause(&self, id: &str) -> RuntimeResult<()> {
            self.inner.unpause(id).await
        }

        async fn stop(&self, id: &str) -> RuntimeResult<()> {
            self.inner.stop(id).await
        }

        async fn remove(&self, id: &str) -> RuntimeResult<()> {
            self.inner.remove(id).await
        }

        async fn list_by_label(
            &self,
            key: &str,
            value: &str,
        ) -> RuntimeResult<Vec<ContainerSummary>> {
            self.inner.list_by_label(key, value).await
        }
    }

    #[tokio::test]
    async fn test_spawn_conflict_reuses_winning_container() {
        let tmp = TempDir::new().unwrap();
        let inner = Arc::new(InMemoryRuntime::new());
        let racing = Arc::new(RacingRuntime {
            inner: inner.clone(),
            miss_next_inspect: AtomicBool::new(false),
        });
        let manager = LifecycleManager::new(
            racing.clone(),
            ResourceLocator::new(tmp.path().join("databases")),
            WorkerSettings {
                image: "db-worker-base:latest".to_string(),
                network: "db-forge-net".to_string(),
            },
        );

        let first = manager.spawn("x").await.unwrap();
        assert!(first.is_created());

        racing.miss_next_inspect.store(true, Ordering::SeqCst);
        let second = manager.spawn("x").await.unwrap();

        assert_eq!(
            second,
            SpawnOutcome::AlreadyRunning {
                container_id: first.container_id().to_string()
            }
        );
        assert_eq!(inner.container_count(), 1);
    }

    #[tokio::test]
    async fn test_spawn_preserves_existing_file() {
        let (_tmp, _runtime, manager) = setup();
        let path = manager.locator().db_path("orders");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"existing-bytes").unwrap();

        manager.spawn("orders").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"existing-bytes");
    }

    #[tokio::test]
    async fn test_spawn_rejects_invalid_name() {
        let (_tmp, runtime, manager) = setup();

        let err = manager.spawn("../escape").await.unwrap_err();

        assert!(matches!(err, GatewayError::InvalidRequest(_)));
        assert_eq!(runtime.container_count(), 0);
    }

    #[tokio::test]
    async fn test_spawn_runtime_unavailable() {
        let (_tmp, runtime, manager) = setup();
        runtime.set_unavailable(true);

        let err = manager.spawn("orders").await.unwrap_err();
        assert!(matches!(err, GatewayError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_prune_stops_then_removes_and_keeps_file() {
        let (_tmp, runtime, manager) = setup();
        let outcome = manager.spawn("orders").await.unwrap();
        let id = outcome.container_id().to_string();

        manager.prune("orders").await.unwrap();

        let ops = runtime.operations();
        assert_eq!(ops[1], format!("stop {}", id));
        assert_eq!(ops[2], format!("remove {}", id));
        assert!(manager.locator().db_path("orders").exists());
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prune_unknown_is_not_found() {
        let (_tmp, _runtime, manager) = setup();
        let err = manager.prune("never_spawned").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_projects_labels() {
        let (_tmp, runtime, manager) = setup();
        manager.spawn("a").await.unwrap();
        manager.spawn("b").await.unwrap();
        runtime
            .set_status("db-worker-b", ContainerStatus::Exited)
            .unwrap();

        let mut instances = manager.list().await.unwrap();
        instances.sort_by(|x, y| x.name.cmp(&y.name));

        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].name, "a");
        assert_eq!(instances[0].status, ContainerStatus::Running);
        assert_eq!(instances[1].name, "b");
        assert_eq!(instances[1].status, ContainerStatus::Exited);
    }

    #[test]
    fn test_missing_name_label_reports_unknown() {
        let mut labels = BTreeMap::new();
        labels.insert(WORKER_LABEL.to_string(), "true".to_string());
        let info = InstanceInfo::from(ContainerSummary {
            id: "abc".to_string(),
            name: "db-worker-x".to_string(),
            status: ContainerStatus::Running,
            labels,
        });
        assert_eq!(info.name, "unknown");
    }
}
