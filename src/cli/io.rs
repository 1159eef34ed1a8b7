//! Terminal I/O for the CLI
//!
//! - Input: one line from stdin
//! - Output: JSON objects on stdout, one per line

use std::io::{self, BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read one non-empty line from stdin, without its line ending.
pub fn read_secret_line() -> CliResult<String> {
    let stdin = io::stdin();
    read_line_from(&mut stdin.lock())
}

fn read_line_from(reader: &mut impl BufRead) -> CliResult<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;

    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    Ok(trimmed.to_string())
}

/// Write a JSON value to stdout followed by a newline
pub fn write_json(value: &Value) -> CliResult<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer(&mut handle, value)?;
    writeln!(handle)?;
    handle.flush()?;
    Ok(())
}
