//! # API REST
//!
//! REST API for the EHR upload service.
//!
//! Handles:
//! - HTTP endpoints with axum (`POST /upload`, `GET /health`)
//! - The OpenAPI document at `/api-docs/openapi.json`
//! - REST-specific concerns (multipart parsing, JSON errors, CORS, body limits)
//!
//! Uses `upload-core` for persistence and the audit log, and `api-shared` for wire types.

#![warn(rust_2018_idioms)]

mod upload;

use api_shared::{ErrorRes, HealthRes, HealthService, UploadForm, UploadRes};
use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use upload_core::{AuditLogger, FileStore, UploadConfig};
use utoipa::OpenApi;

pub use upload::upload;

/// Application state shared across REST API handlers.
///
/// Built once from the startup configuration; request handlers never read the environment.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<UploadConfig>,
    pub file_store: FileStore,
    pub audit_logger: AuditLogger,
}

impl AppState {
    pub fn new(cfg: Arc<UploadConfig>) -> Self {
        Self {
            file_store: FileStore::new(cfg.uploads_dir()),
            audit_logger: AuditLogger::new(cfg.audit_log_path()),
            cfg,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, upload::upload),
    components(schemas(HealthRes, UploadRes, ErrorRes, UploadForm))
)]
pub struct ApiDoc;

/// Build the service router.
///
/// The uploads directory is expected to exist already (see
/// [`UploadConfig::ensure_uploads_dir`]).
pub fn router(cfg: Arc<UploadConfig>) -> Router {
    let body_limit = cfg.max_upload_bytes();

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/api-docs/openapi.json", get(openapi))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(cfg))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint.
///
/// Always answers `{"status":"ok"}` while the process is running.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
