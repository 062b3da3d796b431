//! LLM integration for answering questions about a document.
//!
//! Supports Ollama for local inference and OpenAI-compatible APIs
//! (OpenAI, Groq, Together.ai).

mod client;
mod config;
mod prompts;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::SourceDocument;

pub use client::{build_context, LlmClient};
pub use config::{LlmConfig, LlmProvider};
pub use prompts::DEFAULT_ANSWER_PROMPT;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Failed to connect to LLM service
    #[error("Connection error: {0}")]
    Connection(String),
    /// API returned an error
    #[error("API error: {0}")]
    Api(String),
    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
    /// LLM is disabled
    #[error("LLM is disabled")]
    Disabled,
}

/// Something that answers a question from retrieved sources.
///
/// The returned text is the model's raw output; callers parse it.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn answer(&self, question: &str, sources: &[SourceDocument]) -> Result<String, LlmError>;
}
