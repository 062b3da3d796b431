//! Error responses shared by the handlers.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::super::AppState;
use crate::services::HighlightError;
use crate::storage::StoreError;

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

pub fn store_error_response(e: StoreError) -> Response {
    let status = match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InvalidId(_) => StatusCode::BAD_REQUEST,
        StoreError::NotPdf(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        StoreError::Io(_) | StoreError::Metadata(_) => {
            tracing::error!("Document store failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, e.to_string())
}

pub fn highlight_error_response(e: HighlightError) -> Response {
    match e {
        HighlightError::DocumentUnreadable(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": e.to_string(), "retryable": true })),
        )
            .into_response(),
        HighlightError::BackendNotAvailable(_) => {
            tracing::error!("{}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        HighlightError::Join(_) => {
            tracing::error!("{}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Content of a stored document, or the error response for it.
pub async fn load_document(state: &AppState, doc_id: &str) -> Result<Arc<[u8]>, Response> {
    state
        .store
        .read_bytes(doc_id)
        .await
        .map(Arc::from)
        .map_err(store_error_response)
}
