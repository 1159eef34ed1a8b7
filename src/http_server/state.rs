//! Shared router state

use std::sync::Arc;

use crate::auth::AuthGatekeeper;
use crate::instance::LifecycleManager;
use crate::observability::GatewayMetrics;
use crate::query::QueryEngine;

/// Handles cloned into every request
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<LifecycleManager>,
    pub engine: Arc<QueryEngine>,
    pub gatekeeper: Arc<AuthGatekeeper>,
    pub metrics: Arc<GatewayMetrics>,
}

impl AppState {
    pub fn new(
        lifecycle: LifecycleManager,
        engine: QueryEngine,
        gatekeeper: AuthGatekeeper,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            lifecycle: Arc::new(lifecycle),
            engine: Arc::new(engine),
            gatekeeper: Arc::new(gatekeeper),
            metrics,
        }
    }
}
