//! # Instance Naming
//!
//! Name validation and the deterministic mapping from a database name to
//! its backing file and its worker container.
//!
//! A single validation gate protects both the filesystem path and the
//! container name: no separators, no whitespace, no leading punctuation.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Prefix of every worker container name
pub const WORKER_PREFIX: &str = "db-worker-";

/// File extension of every database file
pub const DB_FILE_EXTENSION: &str = "db";

static DB_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("static pattern"));

/// Returns true if `name` is usable as both a file stem and a container name.
pub fn validate_db_name(name: &str) -> bool {
    DB_NAME_PATTERN.is_match(name)
}

/// Maps database names to on-disk files and container names.
#[derive(Debug, Clone)]
pub struct ResourceLocator {
    data_root: PathBuf,
}

impl ResourceLocator {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    /// Directory holding every database file
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// `<data-root>/<name>.db`
    pub fn db_path(&self, name: &str) -> PathBuf {
        self.data_root
            .join(format!("{}.{}", name, DB_FILE_EXTENSION))
    }

    /// `db-worker-<name>`
    pub fn worker_name(&self, name: &str) -> String {
        worker_name(name)
    }
}

/// Container name for a database, independent of any data root
pub fn worker_name(name: &str) -> String {
    format!("{}{}", WORKER_PREFIX, name)
}
