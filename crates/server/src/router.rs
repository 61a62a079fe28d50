//! HTTP routes for the query server.
//!
//! The index is owned by a single [`EventProcessor`] behind a `RwLock`;
//! query handlers only ever take the read half, so the single-writer
//! contract of the core holds even while requests are served concurrently.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use vigil_core::pipeline::EventProcessor;
use vigil_core::query::{QueryError, QueryService};

/// Shared server state: the processor that owns the indices.
pub struct AppState {
    pub processor: RwLock<EventProcessor>,
}

impl AppState {
    #[must_use]
    pub fn new(processor: EventProcessor) -> Arc<Self> {
        Arc::new(Self { processor: RwLock::new(processor) })
    }
}

/// Query parameters accepted by both the GET and POST forms of `/query`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default = "default_dimension")]
    pub dimension: String,
    #[serde(default = "default_top")]
    pub top: usize,
    #[serde(default)]
    pub alert_type: Option<String>,
}

fn default_dimension() -> String {
    "host".to_string()
}

fn default_top() -> usize {
    5
}

/// Builds the application router with CORS open to any origin.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/query", get(handle_query_get).post(handle_query_post))
        .route("/health", get(handle_health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn handle_query_post(
    State(state): State<Arc<AppState>>,
    Json(params): Json<QueryRequest>,
) -> impl IntoResponse {
    run_query(&state, &params)
}

pub async fn handle_query_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryRequest>,
) -> impl IntoResponse {
    run_query(&state, &params)
}

pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "healthy"}))
}

fn run_query(state: &AppState, params: &QueryRequest) -> (StatusCode, Json<Value>) {
    info!(
        dimension = %params.dimension,
        top = params.top,
        alert_type = params.alert_type.as_deref().unwrap_or("-"),
        "processing query"
    );

    let processor = state.processor.read();
    let service = QueryService::new(processor.coordinator());
    match service.get_top_k_filtered(&params.dimension, params.top, params.alert_type.as_deref()) {
        Ok(reports) => {
            let body: Vec<Value> =
                reports.into_iter().map(|r| r.into_wire(&params.dimension)).collect();
            (StatusCode::OK, Json(Value::Array(body)))
        }
        Err(err @ QueryError::UnknownDimension(_)) => {
            warn!(error = %err, "query rejected");
            (StatusCode::BAD_REQUEST, Json(json!({"error": err.to_string()})))
        }
        Err(err) => {
            warn!(error = %err, "query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": err.to_string()})))
        }
    }
}
