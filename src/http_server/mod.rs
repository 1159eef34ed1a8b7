//! # HTTP Server Module
//!
//! The gateway's REST surface.
//!
//! # Endpoints
//!
//! - `/`, `/health` - Liveness (open)
//! - `/admin/databases*` - Instance lifecycle
//! - `/admin/stats` - Request counters
//! - `/api/db/{db_name}/*` - Raw SQL and structured table/row operations

pub mod admin_routes;
pub mod config;
pub mod data_routes;
pub mod errors;
pub mod health_routes;
pub mod middleware;
pub mod server;
pub mod state;

pub use config::{ConfigError, GatewayConfig};
pub use errors::{ApiResult, ErrorBody, ErrorEnvelope};
pub use server::{build_router, HttpServer};
pub use state::AppState;
