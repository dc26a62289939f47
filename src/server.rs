//! HTTP surface: database downloads, the catalog, and a health check.

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use hepc_extract::DatabaseMetadata;
use hepc_storage::BackendHandle;
use hepc_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::io::ReaderStream;

pub const JSONL_CONTENT_TYPE: &str = "application/x-ndjson";

pub struct AppState {
    pub backend: BackendHandle,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    storage_type: String,
    has_metadata_db: bool,
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = uri.path(),
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Handled request"
    );
    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/db/{*path}", get(fetch_database))
        .route("/index", get(catalog))
        .route("/api/v1/latest_results/codeql-all", get(catalog))
        .route("/health", get(health))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn fetch_database(State(state): State<Arc<AppState>>, Path(path): Path<String>) -> Response {
    match state.backend.fetch(&path).await {
        Ok(fetched) => {
            let headers = [
                (header::CONTENT_TYPE, fetched.content_type),
                (header::CONTENT_LENGTH, fetched.size.to_string()),
            ];
            let body = Body::from_stream(ReaderStream::new(fetched.reader));
            (StatusCode::OK, headers, body).into_response()
        },
        Err(err) => fetch_error_response(&path, &err),
    }
}

fn fetch_error_response(path: &str, err: &StorageError) -> Response {
    let (status, message) = match &**err {
        StorageErrorKind::NotFound(_) => (StatusCode::NOT_FOUND, format!("{path} not found")),
        StorageErrorKind::AccessDenied(_) => (StatusCode::FORBIDDEN, "access denied".to_string()),
        StorageErrorKind::NotAFile(_) => (StatusCode::BAD_REQUEST, format!("{path} is not a file")),
        _ => {
            tracing::error!(path, retryable = err.is_retryable(), error = ?err, "Failed to fetch database");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
        },
    };
    if status != StatusCode::INTERNAL_SERVER_ERROR {
        tracing::debug!(path, status = status.as_u16(), error = ?err, "Rejected fetch");
    }
    (status, message).into_response()
}

/// One JSON record per line.
fn to_jsonl(catalog: &[DatabaseMetadata]) -> String {
    catalog
        .iter()
        .filter_map(|entry| match serde_json::to_string(entry) {
            Ok(line) => Some(line),
            Err(err) => {
                tracing::warn!(content_hash = %entry.content_hash, error = %err, "Skipping unserializable entry");
                None
            },
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn catalog(State(state): State<Arc<AppState>>) -> Response {
    match state.backend.catalog_available().await {
        Ok(true) => {},
        Ok(false) => return (StatusCode::NOT_FOUND, "catalog not available").into_response(),
        Err(err) => {
            tracing::error!(error = ?err, "Failed to check catalog availability");
            return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response();
        },
    }
    match state.backend.list_catalog().await {
        Ok(catalog) => ([(header::CONTENT_TYPE, JSONL_CONTENT_TYPE)], to_jsonl(&catalog)).into_response(),
        Err(err) => {
            tracing::error!(retryable = err.is_retryable(), error = ?err, "Failed to list catalog");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to list databases").into_response()
        },
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let has_metadata_db = state.backend.catalog_available().await.unwrap_or(false);
    Json(HealthResponse {
        status: "ok",
        storage_type: state.backend.kind().to_string(),
        has_metadata_db,
    })
}
