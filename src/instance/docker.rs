//! # Docker CLI Runtime
//!
//! [`ContainerRuntime`] implemented by shelling out to the `docker` binary.
//! Output is requested as JSON (`--format '{{json .}}'`) and parsed with serde.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::runtime::{
    ContainerRuntime, ContainerStatus, ContainerSummary, CreateSpec, RuntimeError, RuntimeResult,
};

/// Default binary looked up on `PATH`
pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// Container runtime backed by the Docker CLI
#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: String,
}

impl DockerCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Run one docker command and return its stdout.
    ///
    /// `subject` names the container the command is about, for error mapping.
    async fn run(&self, args: &[&str], subject: &str) -> RuntimeResult<String> {
        debug!("Executing docker command: {} {}", self.bin, args.join(" "));

        let output = Command::new(&self.bin)
            .args(args)
            .output()
            .await
            .map_err(|e| RuntimeError::Unavailable(format!("failed to run {}: {}", self.bin, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr, subject));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(DEFAULT_DOCKER_BIN)
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn inspect(&self, name: &str) -> RuntimeResult<Option<ContainerSummary>> {
        let result = self
            .run(
                &["container", "inspect", "--format", "{{json .}}", name],
                name,
            )
            .await;

        match result {
            Ok(stdout) => {
                let line = stdout
                    .lines()
                    .find(|l| !l.trim().is_empty())
                    .ok_or_else(|| RuntimeError::Protocol("empty inspect output".to_string()))?;
                parse_inspect_line(line).map(Some)
            }
            Err(RuntimeError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, spec: &CreateSpec) -> RuntimeResult<String> {
        let label_args: Vec<String> = spec
            .labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let mut args: Vec<&str> = vec![
            "run",
            "--detach",
            "--name",
            spec.name.as_str(),
            "--hostname",
            spec.hostname.as_str(),
            "--network",
            spec.network.as_str(),
            "--restart",
            spec.restart_policy.as_str(),
        ];
        for label in &label_args {
            args.push("--label");
            args.push(label.as_str());
        }
        args.push(spec.image.as_str());

        let stdout = self.run(&args, &spec.name).await?;
        let id = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| RuntimeError::Protocol("docker run printed no container ID".to_string()))?;

        Ok(id.to_string())
    }

    async fn start(&self, id: &str) -> RuntimeResult<()> {
        self.run(&["start", id], id).await.map(|_| ())
    }

    async fn unpause(&self, id: &str) -> RuntimeResult<()> {
        self.run(&["unpause", id], id).await.map(|_| ())
    }

    async fn stop(&self, id: &str) -> RuntimeResult<()> {
        self.run(&["stop", id], id).await.map(|_| ())
    }

    async fn remove(&self, id: &str) -> RuntimeResult<()> {
        self.run(&["rm", id], id).await.map(|_| ())
    }

    async fn list_by_label(&self, key: &str, value: &str) -> RuntimeResult<Vec<ContainerSummary>> {
        let filter = format!("label={}={}", key, value);
        let stdout = self
            .run(
                &[
                    "ps",
                    "--all",
                    "--no-trunc",
                    "--filter",
                    filter.as_str(),
                    "--format",
                    "{{json .}}",
                ],
                key,
            )
            .await?;

        stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(parse_ps_line)
            .collect()
    }
}

// ==================
// Output Parsing
// ==================

#[derive(Debug, Deserialize)]
struct InspectRecord {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "State")]
    state: InspectState,
    #[serde(rename = "Config", default)]
    config: Option<InspectConfig>,
}

#[derive(Debug, Deserialize)]
struct InspectState {
    #[serde(rename = "Status")]
    status: String,
}

#[derive(Debug, Deserialize)]
struct InspectConfig {
    #[serde(rename = "Labels", default)]
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct PsRecord {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names", default)]
    names: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

fn parse_inspect_line(line: &str) -> RuntimeResult<ContainerSummary> {
    let record: InspectRecord = serde_json::from_str(line)
        .map_err(|e| RuntimeError::Protocol(format!("bad inspect JSON: {}", e)))?;

    Ok(ContainerSummary {
        id: record.id,
        name: record.name.trim_start_matches('/').to_string(),
        status: ContainerStatus::parse(&record.state.status),
        labels: record
            .config
            .and_then(|c| c.labels)
            .unwrap_or_default(),
    })
}

fn parse_ps_line(line: &str) -> RuntimeResult<ContainerSummary> {
    let record: PsRecord = serde_json::from_str(line)
        .map_err(|e| RuntimeError::Protocol(format!("bad ps JSON: {}", e)))?;

    Ok(ContainerSummary {
        id: record.id,
        name: record.names,
        status: ContainerStatus::parse(&record.state),
        labels: parse_label_string(&record.labels),
    })
}

/// `docker ps` flattens labels to `k1=v1,k2=v2`.
fn parse_label_string(labels: &str) -> BTreeMap<String, String> {
    labels
        .split(',')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            let k = k.trim();
            if k.is_empty() {
                None
            } else {
                Some((k.to_string(), v.to_string()))
            }
        })
        .collect()
}

/// Map a failed command's stderr onto the runtime taxonomy.
fn classify_failure(stderr: &str, subject: &str) -> RuntimeError {
    let lower = stderr.to_ascii_lowercase();
    let message = stderr.trim().to_string();

    if lower.contains("cannot connect to the docker daemon")
        || lower.contains("error during connect")
        || lower.contains("is the docker daemon running")
        || lower.contains("permission denied while trying to connect")
    {
        RuntimeError::Unavailable(message)
    } else if lower.contains("no such container") || lower.contains("no such object") {
        RuntimeError::NotFound(subject.to_string())
    } else if lower.contains("conflict") || lower.contains("is already in use") {
        RuntimeError::Conflict(subject.to_string())
    } else {
        RuntimeError::Failed(message)
    }
}
