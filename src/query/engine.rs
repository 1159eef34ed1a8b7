//! # Query Engine
//!
//! Executes SQL against the per-database SQLite files.
//!
//! Each call opens its own connection on a blocking thread. Concurrent
//! writers to the same file are serialized by SQLite's own lock; the busy
//! timeout makes a second writer wait instead of failing immediately.
//!
//! Existence is decided by the file, not the container: a database whose
//! container was pruned still answers queries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::instance::{validate_db_name, ResourceLocator};

use super::builder::{self, ColumnDefinition, Page};
use super::value::{json_params, sql_to_json};

/// How long a connection waits on a locked database file
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One result row, keyed by column name in declared column order
pub type Row = Map<String, Value>;

/// Statement class, decided once before execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Returns rows (`SELECT ...`)
    Rows,
    /// Mutation or DDL; reports an affected-row count
    Mutation,
}

impl StatementKind {
    /// Case-insensitive `SELECT` prefix check on the trimmed statement.
    pub fn classify(sql: &str) -> Self {
        let head = sql.trim_start();
        let is_select = head
            .get(..6)
            .map(|p| p.eq_ignore_ascii_case("SELECT"))
            .unwrap_or(false);
        if is_select {
            Self::Rows
        } else {
            Self::Mutation
        }
    }
}

/// Result of one statement
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Row data; `count` is always `data.len()`
    Rows { data: Vec<Row>, count: usize },
    /// Affected-row count with no data
    Affected { count: usize, message: String },
}

impl QueryOutcome {
    fn rows(data: Vec<Row>) -> Self {
        let count = data.len();
        Self::Rows { data, count }
    }

    /// The `rows_affected` value reported on the wire
    pub fn rows_affected(&self) -> usize {
        match self {
            Self::Rows { count, .. } | Self::Affected { count, .. } => *count,
        }
    }
}

/// SQL execution against isolated per-database files
#[derive(Debug, Clone)]
pub struct QueryEngine {
    locator: ResourceLocator,
    busy_timeout: Duration,
}

impl QueryEngine {
    pub fn new(locator: ResourceLocator) -> Self {
        Self {
            locator,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Run one raw statement with positional parameters.
    pub async fn execute(
        &self,
        db_name: &str,
        sql: String,
        params: Vec<Value>,
    ) -> GatewayResult<QueryOutcome> {
        let path = self.existing_db_path(db_name).await?;
        let params = json_params(&params)?;
        let kind = StatementKind::classify(&sql);
        let timeout = self.busy_timeout;

        debug!(db_name = %db_name, kind = ?kind, "Executing statement");

        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&path, timeout)?;
            run_statement(&conn, &sql, &params, kind)
        })
        .await?
    }

    /// Structured `CREATE TABLE`, routed through [`execute`](Self::execute).
    pub async fn create_table(
        &self,
        db_name: &str,
        table: &str,
        columns: &[ColumnDefinition],
    ) -> GatewayResult<()> {
        // Name and existence are checked before the body is inspected.
        self.existing_db_path(db_name).await?;
        let sql = builder::create_table_sql(table, columns)?;
        self.execute(db_name, sql, Vec::new()).await.map(|_| ())
    }

    /// Insert a batch of identically-shaped rows in one transaction.
    ///
    /// Either every row is committed or none is.
    pub async fn insert_rows(
        &self,
        db_name: &str,
        table: &str,
        rows: Vec<Row>,
    ) -> GatewayResult<usize> {
        let path = self.existing_db_path(db_name).await?;
        let columns = builder::batch_columns(&rows)?;
        let sql = builder::insert_sql(table, &columns)?;

        let bound = rows
            .iter()
            .map(|row| {
                let values: Vec<Value> = columns
                    .iter()
                    .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                    .collect();
                json_params(&values)
            })
            .collect::<GatewayResult<Vec<_>>>()?;
        let timeout = self.busy_timeout;

        debug!(db_name = %db_name, table = %table, rows = bound.len(), "Inserting rows");

        tokio::task::spawn_blocking(move || {
            let mut conn = open_connection(&path, timeout)?;
            // Dropping an uncommitted transaction rolls it back.
            let tx = conn.transaction()?;
            let mut total = 0;
            {
                let mut stmt = tx.prepare(&sql)?;
                for values in &bound {
                    total += stmt.execute(params_from_iter(values.iter()))?;
                }
            }
            tx.commit()?;
            Ok(total)
        })
        .await?
    }

    /// `SELECT *` with exact-match filters, bound in the order given.
    pub async fn select_rows(
        &self,
        db_name: &str,
        table: &str,
        filters: &[(String, Value)],
        page: Page,
    ) -> GatewayResult<QueryOutcome> {
        self.existing_db_path(db_name).await?;
        let (sql, params) = builder::select_sql(table, filters, page)?;
        self.execute(db_name, sql, params).await
    }

    async fn existing_db_path(&self, db_name: &str) -> GatewayResult<PathBuf> {
        if !validate_db_name(db_name) {
            return Err(GatewayError::invalid_request("Invalid database name."));
        }
        let path = self.locator.db_path(db_name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            Ok(path)
        } else {
            Err(GatewayError::not_found("Database not found."))
        }
    }
}

fn open_connection(path: &Path, busy_timeout: Duration) -> GatewayResult<Connection> {
    // No CREATE flag: the file must have been made by spawn.
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| GatewayError::internal(format!("failed to open {}: {}", path.display(), e)))?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

fn run_statement(
    conn: &Connection,
    sql: &str,
    params: &[rusqlite::types::Value],
    kind: StatementKind,
) -> GatewayResult<QueryOutcome> {
    match kind {
        StatementKind::Rows => {
            let mut stmt = conn.prepare(sql)?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

            let mut rows = stmt.query(params_from_iter(params.iter()))?;
            let mut data = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Map::with_capacity(columns.len());
                for (i, name) in columns.iter().enumerate() {
                    record.insert(name.clone(), sql_to_json(row.get_ref(i)?));
                }
                data.push(record);
            }
            Ok(QueryOutcome::rows(data))
        }
        StatementKind::Mutation => {
            // Autocommit: committed once stepped to completion. Rows from
            // RETURNING or PRAGMA are drained and dropped.
            {
                let mut stmt = conn.prepare(sql)?;
                let mut rows = stmt.query(params_from_iter(params.iter()))?;
                while rows.next()?.is_some() {}
            }
            // Fresh connection per call, so this is 0 unless the statement wrote.
            let count = usize::try_from(conn.changes()).unwrap_or(usize::MAX);
            Ok(QueryOutcome::Affected {
                count,
                message: "Query executed successfully.".to_string(),
            })
        }
    }
}
