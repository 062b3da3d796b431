//! Highlighting, question answering and citation endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::super::AppState;
use super::helpers::{error_response, highlight_error_response, load_document};
use crate::models::{PageMapping, SourceDocument};
use crate::services::inject_citations;

/// Locate request.
#[derive(Debug, Deserialize)]
pub struct LocateRequest {
    #[serde(default)]
    pub excerpts: Vec<String>,
}

/// Highlight request: a model payload produced elsewhere.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRequest {
    /// Raw model output, ideally `{"answer": ..., "sources": ...}`.
    pub output: String,
    #[serde(default)]
    pub source_documents: Vec<SourceDocument>,
}

/// Ask request.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Citation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationRequest {
    pub answer: String,
    #[serde(default)]
    pub excerpts: Vec<String>,
    #[serde(default)]
    pub page_mappings: Vec<PageMapping>,
}

/// Locate excerpts in a stored document.
pub async fn api_locate(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Json(body): Json<LocateRequest>,
) -> impl IntoResponse {
    let bytes = match load_document(&state, &doc_id).await {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    match state
        .highlighter
        .locate_excerpts(bytes, &doc_id, body.excerpts)
        .await
    {
        Ok(result) => Json(serde_json::json!({
            "success": true,
            "annotations": result.annotations,
            "highlightedPages": result.highlighted_pages,
            "totalMatches": result.total_matches,
            "pageMappings": result.page_mappings,
            "timedOut": result.timed_out,
        }))
        .into_response(),
        Err(e) => highlight_error_response(e),
    }
}

/// Annotate an already-produced model payload against a stored document.
pub async fn api_highlight(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Json(body): Json<HighlightRequest>,
) -> impl IntoResponse {
    let bytes = match load_document(&state, &doc_id).await {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    match state
        .highlighter
        .annotate_answer(bytes, &doc_id, &body.output, &body.source_documents)
        .await
    {
        Ok(answer) => Json(answer).into_response(),
        Err(e) => highlight_error_response(e),
    }
}

/// Ask the model a question about a stored document.
pub async fn api_ask(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Json(body): Json<AskRequest>,
) -> impl IntoResponse {
    let question = body.question.trim();
    if question.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Question must not be empty");
    }

    let bytes = match load_document(&state, &doc_id).await {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };

    match state
        .highlighter
        .ask(bytes, &doc_id, question, state.model.as_ref())
        .await
    {
        Ok(answer) => Json(answer).into_response(),
        Err(e) => highlight_error_response(e),
    }
}

/// Inject page citations into an answer.
pub async fn api_citations(
    State(state): State<AppState>,
    Json(body): Json<CitationRequest>,
) -> impl IntoResponse {
    let annotated = inject_citations(
        &body.answer,
        &body.excerpts,
        &body.page_mappings,
        state.highlighter.config(),
    );
    Json(serde_json::json!({ "annotatedAnswer": annotated }))
}
