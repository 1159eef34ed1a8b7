//! Admin HTTP Routes
//!
//! Instance lifecycle (spawn, prune, list) and gateway stats.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::instance::InstanceInfo;
use crate::observability::StatsSnapshot;

use super::errors::ApiResult;
use super::state::AppState;

// ==================
// Response Types
// ==================

#[derive(Debug, Serialize)]
pub struct SpawnResponse {
    pub message: &'static str,
    pub db_name: String,
    pub container_id: String,
}

#[derive(Debug, Serialize)]
pub struct PruneResponse {
    pub message: &'static str,
    pub db_name: String,
}

// ==================
// Router
// ==================

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/databases", get(list_handler))
        .route("/admin/databases/spawn/{db_name}", post(spawn_handler))
        .route("/admin/databases/prune/{db_name}", post(prune_handler))
        .route("/admin/stats", get(stats_handler))
}

// ==================
// Handlers
// ==================

async fn spawn_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<(StatusCode, Json<SpawnResponse>)> {
    let Path(db_name) = path?;
    let outcome = state.lifecycle.spawn(&db_name).await?;

    let status = if outcome.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(SpawnResponse {
            message: outcome.message(),
            container_id: outcome.container_id().to_string(),
            db_name,
        }),
    ))
}

async fn prune_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<PruneResponse>> {
    let Path(db_name) = path?;
    state.lifecycle.prune(&db_name).await?;

    Ok(Json(PruneResponse {
        message: "Database instance pruned successfully.",
        db_name,
    }))
}

async fn list_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<InstanceInfo>>> {
    Ok(Json(state.lifecycle.list().await?))
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.metrics.snapshot())
}
