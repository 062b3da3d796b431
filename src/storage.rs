//! Storage for uploaded PDFs on disk.
//!
//! Each document is two files in the documents directory: `{id}.pdf` with
//! the content and `{id}.json` with its metadata.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

const PDF_MIME: &str = "application/pdf";

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document id: {0}")]
    InvalidId(String),

    #[error("Not a PDF (detected {0})")]
    NotPdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Metadata of a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub id: String,
    pub title: String,
    /// SHA-256 of the content, hex encoded.
    pub content_hash: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Directory-backed document store.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Canonical form of `id`; rejects anything that is not a UUID so ids
    /// can never address paths outside the store.
    fn parse_id(id: &str) -> Result<String, StoreError> {
        Uuid::parse_str(id)
            .map(|uuid| uuid.to_string())
            .map_err(|_| StoreError::InvalidId(id.to_string()))
    }

    fn pdf_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.pdf", id))
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Store PDF bytes under a fresh id.
    pub async fn save(&self, content: &[u8], title: Option<&str>) -> Result<StoredDocument, StoreError> {
        match infer::get(content) {
            Some(kind) if kind.mime_type() == PDF_MIME => {}
            Some(kind) => return Err(StoreError::NotPdf(kind.mime_type().to_string())),
            None => return Err(StoreError::NotPdf("unknown".to_string())),
        }

        let id = Uuid::new_v4().to_string();
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("Document {}", &id[..8]));

        let doc = StoredDocument {
            content_hash: Self::compute_hash(content),
            size: content.len() as u64,
            created_at: Utc::now(),
            title,
            id,
        };

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.pdf_path(&doc.id), content).await?;
        tokio::fs::write(self.meta_path(&doc.id), serde_json::to_vec_pretty(&doc)?).await?;

        tracing::info!("Stored document {} ({} bytes)", doc.id, doc.size);
        Ok(doc)
    }

    /// Metadata for `id`.
    pub async fn get(&self, id: &str) -> Result<StoredDocument, StoreError> {
        let id = Self::parse_id(id)?;
        let raw = match tokio::fs::read(self.meta_path(&id)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Content of `id`.
    pub async fn read_bytes(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let id = Self::parse_id(id)?;
        match tokio::fs::read(self.pdf_path(&id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// All documents, newest first. Unreadable metadata files are skipped.
    pub async fn list(&self) -> Result<Vec<StoredDocument>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut docs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = tokio::fs::read(&path)
                .await
                .map_err(StoreError::from)
                .and_then(|raw| serde_json::from_slice::<StoredDocument>(&raw).map_err(StoreError::from));
            match parsed {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }
}
