//! CLI module for DB-Forge
//!
//! Provides command-line interface for:
//! - serve: run the HTTP gateway
//! - hash-key: produce the admin key hash for the secrets file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, RuntimeKind, ServeArgs};
pub use commands::{build_state, hash_key, resolve_config, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
