//! Router configuration for the web server.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Documents
        .route(
            "/api/documents",
            get(handlers::list_documents).post(handlers::upload_document),
        )
        .route("/api/documents/:doc_id", get(handlers::get_document))
        // Highlighting
        .route("/api/documents/:doc_id/locate", post(handlers::api_locate))
        .route(
            "/api/documents/:doc_id/highlight",
            post(handlers::api_highlight),
        )
        .route("/api/documents/:doc_id/ask", post(handlers::api_ask))
        .route("/api/citations", post(handlers::api_citations))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
