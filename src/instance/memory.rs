//! In-memory container runtime
//!
//! Behaves like a daemon that creates containers instantly. Used by the
//! test suites and by `serve --runtime memory` for local development.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::runtime::{
    ContainerRuntime, ContainerStatus, ContainerSummary, CreateSpec, RuntimeError, RuntimeResult,
};

/// In-memory runtime for testing
#[derive(Debug, Default)]
pub struct InMemoryRuntime {
    containers: RwLock<Vec<ContainerSummary>>,
    operations: RwLock<Vec<String>>,
    unavailable: AtomicBool,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the daemon were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Force a container into a given state (e.g. simulate a crash).
    pub fn set_status(&self, name: &str, status: ContainerStatus) -> RuntimeResult<()> {
        let mut containers = self.write()?;
        let container = containers
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))?;
        container.status = status;
        Ok(())
    }

    /// Number of containers currently known
    pub fn container_count(&self) -> usize {
        self.containers.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Mutating calls in the order they were made, as `"<op> <target>"`
    pub fn operations(&self) -> Vec<String> {
        self.operations
            .read()
            .map(|ops| ops.clone())
            .unwrap_or_default()
    }

    fn check_available(&self) -> RuntimeResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RuntimeError::Unavailable(
                "in-memory runtime marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn record(&self, op: &str, target: &str) {
        if let Ok(mut ops) = self.operations.write() {
            ops.push(format!("{} {}", op, target));
        }
    }

    fn write(&self) -> RuntimeResult<std::sync::RwLockWriteGuard<'_, Vec<ContainerSummary>>> {
        self.containers
            .write()
            .map_err(|_| RuntimeError::Failed("Lock poisoned".to_string()))
    }

    fn read(&self) -> RuntimeResult<std::sync::RwLockReadGuard<'_, Vec<ContainerSummary>>> {
        self.containers
            .read()
            .map_err(|_| RuntimeError::Failed("Lock poisoned".to_string()))
    }

    fn status_by_id(&self, id: &str) -> RuntimeResult<ContainerStatus> {
        self.read()?
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.status.clone())
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))
    }

    fn set_status_by_id(&self, id: &str, status: ContainerStatus) -> RuntimeResult<()> {
        let mut containers = self.write()?;
        let container = containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        container.status = status;
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for InMemoryRuntime {
    async fn inspect(&self, name: &str) -> RuntimeResult<Option<ContainerSummary>> {
        self.check_available()?;
        Ok(self.read()?.iter().find(|c| c.name == name).cloned())
    }

    async fn create(&self, spec: &CreateSpec) -> RuntimeResult<String> {
        self.check_available()?;
        let mut containers = self.write()?;

        if containers.iter().any(|c| c.name == spec.name) {
            return Err(RuntimeError::Conflict(spec.name.clone()));
        }

        let id = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        containers.push(ContainerSummary {
            id: id.clone(),
            name: spec.name.clone(),
            status: ContainerStatus::Running,
            labels: spec.labels.clone(),
        });
        drop(containers);

        self.record("create", &spec.name);
        Ok(id)
    }

    async fn start(&self, id: &str) -> RuntimeResult<()> {
        self.check_available()?;
        if self.status_by_id(id)? == ContainerStatus::Paused {
            return Err(RuntimeError::Failed(format!(
                "cannot start paused container {}, try unpause",
                id
            )));
        }
        self.set_status_by_id(id, ContainerStatus::Running)?;
        self.record("start", id);
        Ok(())
    }

    async fn unpause(&self, id: &str) -> RuntimeResult<()> {
        self.check_available()?;
        if self.status_by_id(id)? != ContainerStatus::Paused {
            return Err(RuntimeError::Failed(format!("container {} is not paused", id)));
        }
        self.set_status_by_id(id, ContainerStatus::Running)?;
        self.record("unpause", id);
        Ok(())
    }

    async fn stop(&self, id: &str) -> RuntimeResult<()> {
        self.check_available()?;
        self.set_status_by_id(id, ContainerStatus::Exited)?;
        self.record("stop", id);
        Ok(())
    }

    async fn remove(&self, id: &str) -> RuntimeResult<()> {
        self.check_available()?;
        let mut containers = self.write()?;

        let index = containers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        if containers[index].status == ContainerStatus::Running {
            return Err(RuntimeError::Failed(format!(
                "cannot remove running container {}",
                id
            )));
        }
        containers.remove(index);
        drop(containers);

        self.record("remove", id);
        Ok(())
    }

    async fn list_by_label(&self, key: &str, value: &str) -> RuntimeResult<Vec<ContainerSummary>> {
        self.check_available()?;
        Ok(self
            .read()?
            .iter()
            .filter(|c| c.label(key) == Some(value))
            .cloned()
            .collect())
    }
}
