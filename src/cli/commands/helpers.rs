//! Shared helper functions for CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::config::Settings;
use crate::pdf;
use crate::services::HighlightService;

/// A PDF read from disk, ready to hand to the highlight service.
pub struct LocalPdf {
    pub document_id: String,
    pub bytes: Arc<[u8]>,
}

/// Read a PDF file, using its file stem as the document id.
pub async fn read_pdf(path: &Path) -> anyhow::Result<LocalPdf> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if infer::get(&bytes).map(|t| t.mime_type()) != Some("application/pdf") {
        anyhow::bail!("{} is not a PDF", path.display());
    }

    let document_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "local".to_string());

    Ok(LocalPdf {
        document_id,
        bytes: Arc::from(bytes),
    })
}

/// Build the highlight service for the configured PDF backend.
pub fn highlight_service(settings: &Settings) -> anyhow::Result<HighlightService> {
    let backend = pdf::create_backend(settings.pdf_backend)?;
    if !backend.is_available() {
        anyhow::bail!(
            "PDF backend {} is not available: {}",
            backend.backend_type(),
            backend.availability_hint()
        );
    }
    Ok(HighlightService::new(
        Arc::from(backend),
        settings.highlight.clone(),
    ))
}
