use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::{run_blocking, ApiError};
use crate::engine::UploadOutcome;
use crate::ingest::IngestReport;
use crate::models::{AddDocumentRequest, AddDocumentResponse, Dashboard, DocumentId};
use crate::state::AppState;

const DEFAULT_SOURCE: &str = "manual";

/// GET /api/admin/dashboard - Documents, source files and index shape
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<Dashboard>, ApiError> {
    let engine = state.engine.clone();
    let dashboard = run_blocking(move || Ok(engine.dashboard())).await?;
    Ok(Json(dashboard))
}

/// POST /api/admin/documents - Add one document and rebuild the index
pub async fn add_document(
    State(state): State<AppState>,
    Json(req): Json<AddDocumentRequest>,
) -> Result<(StatusCode, Json<AddDocumentResponse>), ApiError> {
    let source = req
        .source
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

    let engine = state.engine.clone();
    let id = run_blocking(move || engine.add_document(req.title.trim(), req.content.trim(), &source))
        .await?;
    Ok((StatusCode::CREATED, Json(AddDocumentResponse { id })))
}

/// DELETE /api/admin/documents/:id
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let engine = state.engine.clone();
    run_blocking(move || engine.delete_document(DocumentId(id))).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/admin/sources/:filename - Store a raw file and ingest it
pub async fn upload_source(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadOutcome>), ApiError> {
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "File body is empty".to_string()));
    }

    let engine = state.engine.clone();
    let outcome = run_blocking(move || engine.upload_source(&filename, &body)).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// DELETE /api/admin/sources/:filename - Remove a raw file and its chunks
pub async fn delete_source(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let engine = state.engine.clone();
    let removed = run_blocking(move || engine.delete_source(&filename)).await?;
    Ok(Json(serde_json::json!({ "removed_documents": removed })))
}

/// POST /api/admin/sources/rescan - Ingest files copied into the sources dir
pub async fn rescan_sources(State(state): State<AppState>) -> Result<Json<IngestReport>, ApiError> {
    let engine = state.engine.clone();
    let report = run_blocking(move || engine.rescan_sources()).await?;
    Ok(Json(report))
}
