//! Request middleware
//!
//! Layer order, outermost first:
//! `TraceLayer -> stats -> auth (protected routes only) -> handler`.
//! Auth failures therefore still show up in the stats.

use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::GatewayError;
use crate::observability::GatewayMetrics;

use super::state::AppState;

/// Endpoint key used for requests that matched no route
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Reject the request unless it carries a valid API key.
///
/// Runs before any handler, so a refused request never reaches the
/// lifecycle manager or the query engine.
pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let presented = req
        .headers()
        .get(state.gatekeeper.header_name())
        .and_then(|v| v.to_str().ok());

    if let Err(e) = state.gatekeeper.verify(presented).await {
        warn!(path = %req.uri().path(), error = %e, "Rejected request");
        return Err(e.into());
    }

    Ok(next.run(req).await)
}

/// Count every request by route pattern and every error by status.
pub async fn stats_middleware(
    State(metrics): State<Arc<GatewayMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let endpoint = format!("{} {}", req.method(), route);

    let response = next.run(req).await;
    metrics.record(&endpoint, response.status().as_u16());
    response
}
