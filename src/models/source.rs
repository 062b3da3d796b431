//! Retrieval and model-answer payloads.

use serde::{Deserialize, Serialize};

/// A chunk of document text handed to the model as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    pub page_content: String,
    #[serde(default)]
    pub metadata: SourceMetadata,
}

impl SourceDocument {
    pub fn new(page_content: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: SourceMetadata { page },
        }
    }
}

/// Provenance of a source chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// 1-based page the chunk was taken from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Normalized model output: the answer prose and its supporting excerpts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}
