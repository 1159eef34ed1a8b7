//! CLI argument definitions using clap
//!
//! Commands:
//! - dbforge serve [--config <path>] [overrides...]
//! - dbforge hash-key [--generate]

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// DB-Forge - provisions isolated SQLite databases behind a REST gateway
#[derive(Parser, Debug)]
#[command(name = "dbforge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP gateway
    Serve(ServeArgs),

    /// Hash an admin API key for the secrets file
    HashKey {
        /// Generate a random key instead of reading one from stdin
        #[arg(long)]
        generate: bool,
    },
}

/// Container runtime backing the lifecycle manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuntimeKind {
    /// The local Docker daemon, through the docker CLI
    Docker,
    /// Process-local fake; no containers are started
    Memory,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file (optional)
    #[arg(long, default_value = "./dbforge.json")]
    pub config: PathBuf,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding the database files
    #[arg(long, env = "DBFORGE_DATA_ROOT")]
    pub data_root: Option<PathBuf>,

    /// Worker container image
    #[arg(long, env = "DB_WORKER_IMAGE")]
    pub worker_image: Option<String>,

    /// Network worker containers join
    #[arg(long, env = "CHIMERA_NETWORK")]
    pub network: Option<String>,

    /// Secrets file holding the admin key hash
    #[arg(long, env = "ADMIN_CREDS_PATH")]
    pub secrets_path: Option<PathBuf>,

    /// Header carrying the API key
    #[arg(long, env = "API_KEY_HEADER_NAME")]
    pub api_key_header: Option<String>,

    /// Docker executable
    #[arg(long)]
    pub docker_bin: Option<String>,

    /// Container runtime
    #[arg(long, value_enum, default_value_t = RuntimeKind::Docker)]
    pub runtime: RuntimeKind,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
