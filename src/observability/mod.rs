//! Observability subsystem for the gateway
//!
//! - Structured logging through `tracing`
//! - Request/error counters served by `GET /admin/stats`

mod logging;
mod metrics;

pub use logging::{init_logging, DEFAULT_LOG_FILTER};
pub use metrics::{GatewayMetrics, StatsSnapshot};
