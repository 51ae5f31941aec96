//! HTTP surface
//!
//! JSON endpoints for the textbook frontend. Every handler delegates to the
//! shared [`Assistant`]; its blocking calls to the embedding, chat and vector
//! services run on tokio's blocking pool.


use anyhow::Context;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::rag::{
    Assistant, CollectionResponse, HealthReport, IngestRequest, IngestResponse, QueryRequest,
    QueryResponse,
};

pub const SERVICE_NAME: &str = "Physical AI Textbook RAG API";

#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// A failed operation, reported as HTTP 500 with a `detail` message
#[derive(Debug)]
pub struct ApiError {
    detail: String,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    fn new(action: &str, message: impl std::fmt::Display) -> Self {
        Self {
            detail: format!("Error {}: {}", action, message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("{}", self.detail);
        let body = Json(ErrorBody {
            detail: self.detail,
        });
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Routes plus the CORS policy for the configured origins
#[inline]
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/ingest", post(ingest))
        .route("/api/initialize-collection", post(initialize_collection))
        .route("/api/collection", delete(delete_collection))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Credentialed CORS for an explicit origin list
#[inline]
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Bind the configured address and serve until ctrl-c
#[inline]
pub async fn serve(assistant: Arc<Assistant>, config: &ServerConfig) -> anyhow::Result<()> {
    let app = build_router(AppState { assistant }, &config.cors_origins);
    let bind_addr = config.bind_address();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        return;
    }
    info!("Shutting down gracefully");
}

/// Run an assistant operation on the blocking pool
async fn run_blocking<T, F>(state: &AppState, action: &'static str, operation: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Assistant) -> crate::Result<T> + Send + 'static,
{
    let assistant = Arc::clone(&state.assistant);
    tokio::task::spawn_blocking(move || operation(&assistant))
        .await
        .map_err(|e| ApiError::new(action, e))?
        .map_err(|e| ApiError::new(action, e))
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let assistant = Arc::clone(&state.assistant);
    let report = tokio::task::spawn_blocking(move || assistant.health())
        .await
        .unwrap_or_else(|e| HealthReport {
            status: "ok".to_string(),
            qdrant: format!("error: {}", e),
            openai: "unknown".to_string(),
        });
    Json(report)
}

async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    info!("POST /api/query");
    run_blocking(&state, "processing query", move |assistant| {
        assistant.answer(&request)
    })
    .await
    .map(Json)
}

async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    info!("POST /api/ingest");
    run_blocking(&state, "ingesting content", move |assistant| {
        assistant.ingest(&request)
    })
    .await
    .map(Json)
}

async fn initialize_collection(
    State(state): State<AppState>,
) -> Result<Json<CollectionResponse>, ApiError> {
    info!("POST /api/initialize-collection");
    run_blocking(&state, "initializing collection", Assistant::initialize_collection)
        .await
        .map(Json)
}

async fn delete_collection(
    State(state): State<AppState>,
) -> Result<Json<CollectionResponse>, ApiError> {
    info!("DELETE /api/collection");
    run_blocking(&state, "deleting collection", Assistant::delete_collection)
        .await
        .map(Json)
}
