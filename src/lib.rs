//! dbforge - provisions isolated SQLite-backed databases as worker
//! containers and serves them over a REST gateway
//!
//! Request path: auth gatekeeper, then either the instance lifecycle
//! manager (admin routes) or the query engine (data routes). Both resolve
//! names through the same validator and resource locator.

pub mod auth;
pub mod cli;
pub mod error;
pub mod http_server;
pub mod instance;
pub mod observability;
pub mod query;

pub use error::{GatewayError, GatewayResult};
