//! Axum handlers for the chat page and the admin console.

pub mod admin;
pub mod chat;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::Html;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::auth::require_admin;
use crate::error::RagError;
use crate::state::AppState;

/// Largest accepted source upload.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Error shape returned by every handler.
pub type ApiError = (StatusCode, String);

/// Map a core error onto an HTTP status.
pub fn error_response(err: RagError) -> ApiError {
    let status = match &err {
        RagError::NotFound(_) => StatusCode::NOT_FOUND,
        RagError::InvalidInput(_) | RagError::InvalidChunking { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {err}");
    }
    (status, err.to_string())
}

/// Run an index-mutating closure off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, RagError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Background task failed: {e}"),
            )
        })?
        .map_err(error_response)
}

/// The full application router.
pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/documents", post(admin::add_document))
        .route("/api/admin/documents/{id}", delete(admin::delete_document))
        .route(
            "/api/admin/sources/{filename}",
            put(admin::upload_source).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/admin/sources/{filename}", delete(admin::delete_source))
        .route("/api/admin/sources/rescan", post(admin::rescan_sources))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/", get(serve_index))
        .route("/api/chat", post(chat::chat))
        .route("/api/chat/clear", post(chat::clear_chat))
        .route("/api/chat/history", get(chat::history))
        .merge(admin_routes)
        .with_state(state)
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}
