//! CLI command implementations

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::auth::crypto::{generate_api_key, hash_api_key};
use crate::auth::AuthGatekeeper;
use crate::http_server::{AppState, GatewayConfig, HttpServer};
use crate::instance::{
    ContainerRuntime, DockerCli, InMemoryRuntime, LifecycleManager, ResourceLocator,
    WorkerSettings,
};
use crate::observability::{init_logging, GatewayMetrics};
use crate::query::QueryEngine;

use super::args::{Command, RuntimeKind, ServeArgs};
use super::errors::{CliError, CliResult};
use super::io::{read_secret_line, write_json};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve(args) => serve(args),
        Command::HashKey { generate } => hash_key(generate),
    }
}

/// Load the config file, then apply flag and environment overrides.
pub fn resolve_config(args: &ServeArgs) -> CliResult<GatewayConfig> {
    let mut config = GatewayConfig::load(&args.config)?;

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(data_root) = &args.data_root {
        config.data_root = data_root.clone();
    }
    if let Some(image) = &args.worker_image {
        config.worker_image = image.clone();
    }
    if let Some(network) = &args.network {
        config.network = network.clone();
    }
    if let Some(path) = &args.secrets_path {
        config.secrets_path = path.clone();
    }
    if let Some(header) = &args.api_key_header {
        config.api_key_header = header.clone();
    }
    if let Some(bin) = &args.docker_bin {
        config.docker_bin = bin.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Assemble the gateway's shared state from a resolved config.
pub fn build_state(config: &GatewayConfig, runtime: Arc<dyn ContainerRuntime>) -> AppState {
    let locator = ResourceLocator::new(config.data_root.clone());
    let lifecycle = LifecycleManager::new(
        runtime,
        locator.clone(),
        WorkerSettings {
            image: config.worker_image.clone(),
            network: config.network.clone(),
        },
    );
    let engine = QueryEngine::new(locator);
    let gatekeeper =
        AuthGatekeeper::from_secrets_file(&config.secrets_path, config.api_key_header.clone());

    AppState::new(lifecycle, engine, gatekeeper, Arc::new(GatewayMetrics::new()))
}

/// Start the HTTP gateway
///
/// 1. Initialise logging
/// 2. Resolve configuration
/// 3. Build runtime, engine and gatekeeper
/// 4. Serve on a multi-threaded tokio runtime
pub fn serve(args: ServeArgs) -> CliResult<()> {
    init_logging(args.log_json);

    let config = resolve_config(&args)?;

    let runtime: Arc<dyn ContainerRuntime> = match args.runtime {
        RuntimeKind::Docker => Arc::new(DockerCli::new(config.docker_bin.clone())),
        RuntimeKind::Memory => {
            warn!("Using in-memory container runtime; no worker containers will be started");
            Arc::new(InMemoryRuntime::new())
        }
    };

    info!(
        data_root = %config.data_root.display(),
        worker_image = %config.worker_image,
        network = %config.network,
        runtime = ?args.runtime,
        "Starting DB-Forge gateway"
    );

    let state = build_state(&config, runtime);
    let server = HttpServer::with_state(config, state);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })?;

    Ok(())
}

/// Print the Argon2id hash of an admin key.
///
/// With `generate`, a fresh random key is created and printed once; it is
/// not recoverable from the hash.
pub fn hash_key(generate: bool) -> CliResult<()> {
    let key = if generate {
        generate_api_key()
    } else {
        read_secret_line()?
    };

    let hash = hash_api_key(&key)?;

    if generate {
        write_json(&json!({ "api_key": key }))?;
    }
    write_json(&json!({ "password_hash": hash }))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use tempfile::TempDir;

    fn serve_args(extra: &[&str]) -> ServeArgs {
        let mut argv = vec!["dbforge", "serve"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Serve(args) => args,
            other => panic!("expected serve, got {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("dbforge.json");
        std::fs::write(&config_path, r#"{"port": 9100, "worker_image": "from-file:1"}"#).unwrap();

        let args = serve_args(&[
            "--config",
            config_path.to_str().unwrap(),
            "--worker-image",
            "from-flag:2",
        ]);
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.worker_image, "from-flag:2");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let tmp = TempDir::new().unwrap();
        let args = serve_args(&[
            "--config",
            tmp.path().join("absent.json").to_str().unwrap(),
            "--port",
            "0",
        ]);
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn test_build_state_loads_secrets() {
        let tmp = TempDir::new().unwrap();
        let secrets = tmp.path().join("admin.json");
        std::fs::write(
            &secrets,
            json!({ "password_hash": hash_api_key("k").unwrap() }).to_string(),
        )
        .unwrap();

        let config = GatewayConfig {
            data_root: tmp.path().join("databases"),
            secrets_path: secrets,
            ..GatewayConfig::default()
        };
        let state = build_state(&config, Arc::new(InMemoryRuntime::new()));

        assert!(state.gatekeeper.is_configured());
        assert_eq!(state.gatekeeper.header_name(), "X-API-Key");
    }
}
