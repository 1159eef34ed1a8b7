//! # HTTP Server
//!
//! Combines the health, admin and data routers behind the middleware stack.

use std::net::SocketAddr;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::admin_routes::admin_routes;
use super::config::GatewayConfig;
use super::data_routes::data_routes;
use super::health_routes::health_routes;
use super::middleware::{auth_middleware, stats_middleware};
use super::state::AppState;

/// HTTP server for the gateway
pub struct HttpServer {
    config: GatewayConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server over already-built state
    pub fn with_state(config: GatewayConfig, state: AppState) -> Self {
        let router = build_router(&config, state);
        Self { config, router }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process is stopped
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid bind address {}: {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "DB-Forge gateway listening");

        axum::serve(listener, self.router).await
    }
}

/// Build the full router.
///
/// `/` and `/health` are open; everything else requires the API key.
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    let cors = if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let protected = Router::new()
        .merge(admin_routes())
        .merge(data_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(health_routes())
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            stats_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
