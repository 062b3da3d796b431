//! Document upload and metadata endpoints.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::super::AppState;
use super::helpers::store_error_response;

/// Query params for uploads.
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub title: Option<String>,
}

/// Store a PDF sent as the raw request body.
pub async fn upload_document(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> impl IntoResponse {
    match state.store.save(&body, params.title.as_deref()).await {
        Ok(doc) => (StatusCode::CREATED, Json(doc)).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// List stored documents, newest first.
pub async fn list_documents(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list().await {
        Ok(docs) => Json(docs).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// Metadata of one document.
pub async fn get_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> impl IntoResponse {
    match state.store.get(&doc_id).await {
        Ok(doc) => Json(doc).into_response(),
        Err(e) => store_error_response(e),
    }
}
