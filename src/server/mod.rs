//! Web server exposing upload, highlighting and citation endpoints.
//!
//! All endpoints speak JSON. Highlighting failures other than an
//! undecodable document degrade to smaller results rather than errors.

mod handlers;
mod routes;

pub use routes::create_router;

use std::sync::Arc;

use crate::config::Settings;
use crate::llm::{AnswerModel, LlmClient};
use crate::pdf;
use crate::services::HighlightService;
use crate::storage::DocumentStore;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub highlighter: HighlightService,
    pub model: Arc<dyn AnswerModel>,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let backend = pdf::create_backend(settings.pdf_backend)?;
        if !backend.is_available() {
            tracing::warn!(
                "PDF backend {} is not available: {}",
                backend.backend_type(),
                backend.availability_hint()
            );
        }

        Ok(Self {
            store: Arc::new(DocumentStore::new(settings.documents_dir.clone())),
            highlighter: HighlightService::new(Arc::from(backend), settings.highlight.clone()),
            model: Arc::new(LlmClient::new(settings.llm.clone())),
        })
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("Starting server at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::config::HighlightConfig;
    use crate::llm::LlmError;
    use crate::models::SourceDocument;
    use crate::pdf::{
        FixtureBackend, LayoutDocument, PageLayout, PdfBackend, PdfBackendType, PdfDocument,
        PdfError,
    };

    const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF\n";
    const SENTENCE: &str = "Viruses cannot reproduce independently.";

    struct CannedModel;

    #[async_trait]
    impl AnswerModel for CannedModel {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn answer(&self, _question: &str, _sources: &[SourceDocument]) -> Result<String, LlmError> {
            Ok(format!(
                r#"{{"answer": "Viruses cannot reproduce alone.", "sources": "{}"}}"#,
                SENTENCE
            ))
        }
    }

    struct BrokenBackend;

    impl PdfBackend for BrokenBackend {
        fn backend_type(&self) -> PdfBackendType {
            PdfBackendType::Poppler
        }

        fn is_available(&self) -> bool {
            true
        }

        fn availability_hint(&self) -> String {
            String::new()
        }

        fn open(&self, _bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfError> {
            Err(PdfError::DocumentUnreadable("xref table is corrupt".to_string()))
        }
    }

    fn fixture() -> LayoutDocument {
        LayoutDocument::new(vec![
            PageLayout::from_text_lines(&["Cells are the unit of life."]),
            PageLayout::from_text_lines(&[SENTENCE]),
        ])
    }

    fn setup_test_app_with(backend: Arc<dyn PdfBackend>) -> (axum::Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let state = AppState {
            store: Arc::new(DocumentStore::new(dir.path().join("documents"))),
            highlighter: HighlightService::new(backend, HighlightConfig::default()),
            model: Arc::new(CannedModel),
        };
        (create_router(state), dir)
    }

    fn setup_test_app() -> (axum::Router, tempfile::TempDir) {
        setup_test_app_with(Arc::new(FixtureBackend(fixture())))
    }

    async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn upload(app: &axum::Router) -> String {
        let (status, json) = send(
            app,
            Request::builder()
                .method("POST")
                .uri("/api/documents?title=Biology")
                .body(Body::from(PDF))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["title"], "Biology");
        json["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_upload_list_and_get() {
        let (app, _dir) = setup_test_app();
        let id = upload(&app).await;

        let (status, json) = send(
            &app,
            Request::builder().uri("/api/documents").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);

        let (status, json) = send(
            &app,
            Request::builder()
                .uri(format!("/api/documents/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], id.as_str());
        assert_eq!(json["size"], PDF.len());
        assert!(json["contentHash"].is_string());
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let (app, _dir) = setup_test_app();
        let (status, json) = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/api/documents")
                .body(Body::from("hello"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_document_not_found_and_bad_id() {
        let (app, _dir) = setup_test_app();
        let missing = uuid::Uuid::new_v4();

        let (status, _) = send(
            &app,
            Request::builder()
                .uri(format!("/api/documents/{}", missing))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            post_json(
                "/api/documents/not-a-uuid/locate",
                serde_json::json!({ "excerpts": [SENTENCE] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_locate() {
        let (app, _dir) = setup_test_app();
        let id = upload(&app).await;

        let (status, json) = send(
            &app,
            post_json(
                &format!("/api/documents/{}/locate", id),
                serde_json::json!({ "excerpts": [SENTENCE, "short"] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["totalMatches"], 1);
        assert_eq!(json["highlightedPages"], serde_json::json!([2]));
        assert_eq!(json["annotations"][0]["type"], "highlight");
        assert_eq!(json["annotations"][0]["pageNumber"], 2);
        assert_eq!(json["annotations"][0]["documentId"], id.as_str());
        assert_eq!(json["pageMappings"][0]["pages"], serde_json::json!([2]));
    }

    #[tokio::test]
    async fn test_highlight_with_malformed_output() {
        let (app, _dir) = setup_test_app();
        let id = upload(&app).await;

        let (status, json) = send(
            &app,
            post_json(
                &format!("/api/documents/{}/highlight", id),
                serde_json::json!({
                    "output": "Just some freeform text",
                    "sourceDocuments": [{ "pageContent": "Cells", "metadata": { "page": 1 } }]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["answer"], "Just some freeform text");
        assert_eq!(json["sources"], serde_json::json!([]));
        assert_eq!(json["fallback"], true);
        assert_eq!(json["highlightedPages"], serde_json::json!([1]));
    }

    #[tokio::test]
    async fn test_ask() {
        let (app, _dir) = setup_test_app();
        let id = upload(&app).await;

        let (status, json) = send(
            &app,
            post_json(
                &format!("/api/documents/{}/ask", id),
                serde_json::json!({ "question": "Can viruses reproduce?" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["answer"], "Viruses cannot reproduce alone (page 2).");
        assert_eq!(json["highlightedPages"], serde_json::json!([2]));

        let (status, _) = send(
            &app,
            post_json(
                &format!("/api/documents/{}/ask", id),
                serde_json::json!({ "question": "   " }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unreadable_document_is_retryable() {
        let (app, _dir) = setup_test_app_with(Arc::new(BrokenBackend));
        let id = upload(&app).await;

        let (status, json) = send(
            &app,
            post_json(
                &format!("/api/documents/{}/locate", id),
                serde_json::json!({ "excerpts": [SENTENCE] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["retryable"], true);
    }

    #[tokio::test]
    async fn test_citations() {
        let (app, _dir) = setup_test_app();
        let excerpt = "Viruses replicate inside host cells and destroy them.";
        let (status, json) = send(
            &app,
            post_json(
                "/api/citations",
                serde_json::json!({
                    "answer": "Viruses replicate inside host cells.",
                    "excerpts": [excerpt],
                    "pageMappings": [{ "excerpt": excerpt, "pages": [18] }]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["annotatedAnswer"],
            "Viruses replicate inside host cells (page 18)."
        );
    }
}
