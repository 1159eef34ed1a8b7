//! # Query Layer
//!
//! Raw and structured SQL against the per-instance SQLite files.

pub mod builder;
pub mod engine;
pub mod value;

pub use builder::{ColumnDefinition, Page};
pub use engine::{QueryEngine, QueryOutcome, Row, StatementKind, DEFAULT_BUSY_TIMEOUT};
