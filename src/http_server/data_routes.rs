//! Data HTTP Routes
//!
//! Raw SQL and structured table/row endpoints, all scoped to one database.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;
use crate::query::{ColumnDefinition, Page, QueryOutcome, Row};

use super::errors::ApiResult;
use super::state::AppState;

/// Query-string keys on the select endpoint that are not column filters
pub const LIMIT_PARAM: &str = "limit";
pub const OFFSET_PARAM: &str = "offset";

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    #[serde(default)]
    pub params: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
    pub rows_affected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::Rows { data, count } => Self {
                data: Some(data),
                rows_affected: count,
                message: None,
            },
            QueryOutcome::Affected { count, message } => Self {
                data: None,
                rows_affected: count,
                message: Some(message),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTableRequest {
    pub table_name: String,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Deserialize)]
pub struct InsertRequest {
    pub rows: Vec<Row>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InsertResponse {
    pub message: &'static str,
    pub rows_affected: usize,
}

// ==================
// Router
// ==================

pub fn data_routes() -> Router<AppState> {
    Router::new()
        .route("/api/db/{db_name}/query", post(query_handler))
        .route("/api/db/{db_name}/tables", post(create_table_handler))
        .route(
            "/api/db/{db_name}/tables/{table_name}/rows",
            post(insert_rows_handler).get(select_rows_handler),
        )
}

// ==================
// Handlers
// ==================

async fn query_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<QueryResponse>> {
    let Path(db_name) = path?;
    let Json(request) = body?;

    let outcome = state
        .engine
        .execute(&db_name, request.sql, request.params.unwrap_or_default())
        .await?;
    Ok(Json(outcome.into()))
}

async fn create_table_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<CreateTableRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Path(db_name) = path?;
    let Json(request) = body?;

    state
        .engine
        .create_table(&db_name, &request.table_name, &request.columns)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("Table '{}' created successfully.", request.table_name),
        }),
    ))
}

async fn insert_rows_handler(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Result<Json<InsertRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<InsertResponse>)> {
    let Path((db_name, table_name)) = path?;
    let Json(request) = body?;

    let inserted = state
        .engine
        .insert_rows(&db_name, &table_name, request.rows)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InsertResponse {
            message: "Rows inserted successfully.",
            rows_affected: inserted,
        }),
    ))
}

async fn select_rows_handler(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<QueryResponse>> {
    let Path((db_name, table_name)) = path?;
    let Query(pairs) = query?;
    let (filters, page) = split_select_params(pairs)?;

    let outcome = state
        .engine
        .select_rows(&db_name, &table_name, &filters, page)
        .await?;
    Ok(Json(outcome.into()))
}

/// Separate paging keys from equality filters, keeping filter order.
fn split_select_params(
    pairs: Vec<(String, String)>,
) -> Result<(Vec<(String, Value)>, Page), GatewayError> {
    let mut page = Page::default();
    let mut filters = Vec::with_capacity(pairs.len());

    for (key, value) in pairs {
        match key.as_str() {
            LIMIT_PARAM => page.limit = Some(parse_paging_value(LIMIT_PARAM, &value)?),
            OFFSET_PARAM => page.offset = Some(parse_paging_value(OFFSET_PARAM, &value)?),
            _ => filters.push((key, Value::String(value))),
        }
    }

    Ok((filters, page))
}

fn parse_paging_value(key: &str, value: &str) -> Result<u64, GatewayError> {
    value.trim().parse::<u64>().map_err(|_| {
        GatewayError::invalid_request(format!("'{}' must be a non-negative integer.", key))
    })
}
