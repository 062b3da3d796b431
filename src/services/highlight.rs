//! Highlight orchestration: model output in, annotations and cited answer out.
//!
//! Each call decodes its own document handle on a blocking worker, so
//! concurrent requests never share decoder state. Locating runs under the
//! configured timeout; expiry cancels the worker between pages and yields an
//! empty, retryable result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::HighlightConfig;
use crate::llm::AnswerModel;
use crate::models::{
    highlighted_pages, Annotation, BoundingBox, HighlightStyle, PageMapping, SourceDocument,
};
use crate::pdf::{self, PdfBackend, PdfError};

use super::answer::parse_model_output;
use super::citation::inject_citations;
use super::locate::{locate, LocateResult};
use super::retrieval::retrieve;

const FALLBACK_X: f64 = 50.0;
const FALLBACK_Y: f64 = 50.0;
const FALLBACK_WIDTH: f64 = 500.0;
const FALLBACK_HEIGHT: f64 = 100.0;
const FALLBACK_PITCH: f64 = 110.0;

/// Errors from highlight orchestration.
#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("Document could not be decoded as PDF: {0}")]
    DocumentUnreadable(String),

    #[error("PDF backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Highlight worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<PdfError> for HighlightError {
    fn from(e: PdfError) -> Self {
        match e {
            PdfError::BackendNotAvailable(msg) => HighlightError::BackendNotAvailable(msg),
            PdfError::DocumentUnreadable(msg) => HighlightError::DocumentUnreadable(msg),
            other => HighlightError::DocumentUnreadable(other.to_string()),
        }
    }
}

/// Answer text with its located evidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedAnswer {
    /// Answer with `(page N)` citations injected.
    pub answer: String,
    /// Answer as the model produced it.
    pub raw_answer: String,
    /// Excerpts parsed from the model output.
    pub sources: Vec<String>,
    pub annotations: Vec<Annotation>,
    pub page_mappings: Vec<PageMapping>,
    pub highlighted_pages: Vec<u32>,
    /// Located (text-searched) annotations; fallback boxes are not counted.
    pub total_matches: usize,
    /// Annotations are coarse page boxes, not located text.
    pub fallback: bool,
    pub timed_out: bool,
}

impl AnnotatedAnswer {
    /// An answer with no evidence attached.
    pub fn plain(answer: impl Into<String>) -> Self {
        let answer = answer.into();
        Self {
            raw_answer: answer.clone(),
            answer,
            ..Default::default()
        }
    }
}

/// One coarse box per source page hint, stacked down the page.
pub fn fallback_annotations(
    document_id: &str,
    source_documents: &[SourceDocument],
    style: &HighlightStyle,
) -> Vec<Annotation> {
    let mut placed: HashMap<u32, usize> = HashMap::new();
    let mut seen: Vec<(u32, &str)> = Vec::new();
    let mut annotations = Vec::new();

    for source in source_documents {
        let Some(page) = source.metadata.page.filter(|p| *p > 0) else {
            continue;
        };
        let content = source.page_content.trim();
        if seen.contains(&(page, content)) {
            continue;
        }
        seen.push((page, content));

        let k = placed.entry(page).or_insert(0);
        let bbox = BoundingBox::new(
            FALLBACK_X,
            FALLBACK_Y + *k as f64 * FALLBACK_PITCH,
            FALLBACK_WIDTH,
            FALLBACK_HEIGHT,
        );
        *k += 1;
        annotations.push(Annotation::highlight(document_id, page, bbox, content, style));
    }
    annotations
}

/// Runs the locate → cite pipeline against a PDF backend.
#[derive(Clone)]
pub struct HighlightService {
    backend: Arc<dyn PdfBackend>,
    config: Arc<HighlightConfig>,
}

impl HighlightService {
    pub fn new(backend: Arc<dyn PdfBackend>, config: HighlightConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn PdfBackend {
        self.backend.as_ref()
    }

    /// Find `excerpts` in the document.
    pub async fn locate_excerpts(
        &self,
        bytes: Arc<[u8]>,
        document_id: &str,
        excerpts: Vec<String>,
    ) -> Result<LocateResult, HighlightError> {
        let cancel = CancellationToken::new();
        // Stops the worker if this future is dropped (client went away).
        let _guard = cancel.clone().drop_guard();

        let backend = self.backend.clone();
        let config = self.config.clone();
        let document_id = document_id.to_string();
        let token = cancel.clone();
        let task = tokio::task::spawn_blocking(move || -> Result<LocateResult, PdfError> {
            let doc = backend.open(&bytes)?;
            Ok(locate(doc.as_ref(), &excerpts, &document_id, &config, &token))
        });

        let outcome = if self.config.locate_timeout_secs == 0 {
            task.await?
        } else {
            let limit = Duration::from_secs(self.config.locate_timeout_secs);
            match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined?,
                Err(_) => {
                    warn!("Locate timed out after {:?}", limit);
                    cancel.cancel();
                    return Ok(LocateResult::abandoned());
                }
            }
        };
        let result = outcome?;

        info!(
            "Located {} match(es) on {} page(s)",
            result.total_matches,
            result.highlighted_pages.len()
        );
        Ok(result)
    }

    /// Plain text of every page.
    pub async fn page_texts(&self, bytes: Arc<[u8]>) -> Result<Vec<String>, HighlightError> {
        let backend = self.backend.clone();
        let texts = tokio::task::spawn_blocking(move || -> Result<Vec<String>, PdfError> {
            let doc = backend.open(&bytes)?;
            Ok(pdf::page_texts(doc.as_ref()))
        })
        .await??;
        Ok(texts)
    }

    /// Locate the excerpts of a model payload and cite them in its answer.
    ///
    /// Malformed payloads become an uncited answer. When nothing is located,
    /// the source documents' page hints get coarse fallback boxes instead.
    pub async fn annotate_answer(
        &self,
        bytes: Arc<[u8]>,
        document_id: &str,
        raw_output: &str,
        source_documents: &[SourceDocument],
    ) -> Result<AnnotatedAnswer, HighlightError> {
        let parsed = parse_model_output(raw_output);

        let located = if parsed.sources.is_empty() {
            LocateResult::default()
        } else {
            self.locate_excerpts(bytes, document_id, parsed.sources.clone())
                .await?
        };

        if !located.annotations.is_empty() {
            let answer = inject_citations(
                &parsed.answer,
                &parsed.sources,
                &located.page_mappings,
                &self.config,
            );
            return Ok(AnnotatedAnswer {
                answer,
                raw_answer: parsed.answer,
                sources: parsed.sources,
                annotations: located.annotations,
                page_mappings: located.page_mappings,
                highlighted_pages: located.highlighted_pages,
                total_matches: located.total_matches,
                fallback: false,
                timed_out: false,
            });
        }

        let annotations =
            fallback_annotations(document_id, source_documents, &self.config.style());
        if !annotations.is_empty() {
            info!("No excerpts located; {} fallback box(es)", annotations.len());
        }
        Ok(AnnotatedAnswer {
            answer: parsed.answer.clone(),
            raw_answer: parsed.answer,
            sources: parsed.sources,
            highlighted_pages: highlighted_pages(&annotations),
            fallback: !annotations.is_empty(),
            annotations,
            page_mappings: Vec::new(),
            total_matches: 0,
            timed_out: located.timed_out,
        })
    }

    /// Answer `question` about the document with `model`, then annotate.
    ///
    /// A failing model degrades to an explanatory answer without evidence.
    pub async fn ask(
        &self,
        bytes: Arc<[u8]>,
        document_id: &str,
        question: &str,
        model: &dyn AnswerModel,
    ) -> Result<AnnotatedAnswer, HighlightError> {
        let texts = self.page_texts(bytes.clone()).await?;
        let sources = retrieve(
            question,
            &texts,
            self.config.retrieval_top_k,
            self.config.retrieval_chunk_chars,
        );

        info!(
            "Asking {} with {} retrieved chunk(s)",
            model.model_name(),
            sources.len()
        );
        let raw = match model.answer(question, &sources).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Model failed to answer: {}", e);
                return Ok(AnnotatedAnswer::plain(format!(
                    "Sorry, no answer could be generated ({}).",
                    e
                )));
            }
        };

        self.annotate_answer(bytes, document_id, &raw, &sources)
            .await
    }
}
