//! HTTP client for Ollama and OpenAI-compatible chat APIs.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{LlmConfig, LlmProvider};
use super::{AnswerModel, LlmError};
use crate::models::SourceDocument;

/// LLM client for question answering.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// OpenAI-compatible chat request.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    error: Option<ChatApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatApiError {
    message: String,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // 5 min timeout for slow models
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn models_url(&self) -> String {
        match self.config.provider {
            LlmProvider::Ollama => format!("{}/api/tags", self.config.endpoint),
            LlmProvider::OpenAI => format!("{}/v1/models", self.config.endpoint),
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Check if the LLM service is available.
    pub async fn is_available(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        match self.authorized(self.client.get(self.models_url())).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List available models.
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let resp = self
            .authorized(self.client.get(self.models_url()))
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LlmError::Api(format!("HTTP {}", resp.status())));
        }

        #[derive(Deserialize)]
        struct TagsResponse {
            models: Vec<ModelInfo>,
        }

        #[derive(Deserialize)]
        struct ModelInfo {
            name: String,
        }

        #[derive(Deserialize)]
        struct ModelList {
            data: Vec<ModelId>,
        }

        #[derive(Deserialize)]
        struct ModelId {
            id: String,
        }

        match self.config.provider {
            LlmProvider::Ollama => {
                let tags: TagsResponse = resp
                    .json()
                    .await
                    .map_err(|e| LlmError::Parse(e.to_string()))?;
                Ok(tags.models.into_iter().map(|m| m.name).collect())
            }
            LlmProvider::OpenAI => {
                let list: ModelList = resp
                    .json()
                    .await
                    .map_err(|e| LlmError::Parse(e.to_string()))?;
                Ok(list.data.into_iter().map(|m| m.id).collect())
            }
        }
    }

    /// Ask a question against retrieved sources. Returns the raw model text,
    /// which is expected (but not guaranteed) to be an `{answer, sources}` JSON object.
    pub async fn answer_question(
        &self,
        question: &str,
        sources: &[SourceDocument],
    ) -> Result<String, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }

        let context = build_context(sources, self.config.max_content_chars);
        let prompt = self
            .config
            .get_answer_prompt()
            .replace("{context}", &context)
            .replace("{question}", question);

        debug!(
            "Asking {} with {} context chars",
            self.config.model,
            context.len()
        );
        match self.config.provider {
            LlmProvider::Ollama => self.call_ollama(&prompt).await,
            LlmProvider::OpenAI => self.call_openai(&prompt).await,
        }
    }

    /// Call Ollama API with a prompt.
    async fn call_ollama(&self, prompt: &str) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.config.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let ollama_resp: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(ollama_resp.response)
    }

    /// Call an OpenAI-compatible chat completions endpoint.
    async fn call_openai(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/v1/chat/completions", self.config.endpoint);
        let resp = self
            .authorized(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        if let Some(error) = chat.error {
            return Err(LlmError::Api(error.message));
        }

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("No choices in response".to_string()))
    }
}

#[async_trait]
impl AnswerModel for LlmClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn answer(&self, question: &str, sources: &[SourceDocument]) -> Result<String, LlmError> {
        self.answer_question(question, sources).await
    }
}

/// Render sources as page-labelled context blocks, truncated to `max_chars`
/// (UTF-8 safe).
pub fn build_context(sources: &[SourceDocument], max_chars: usize) -> String {
    let mut context = String::new();
    for source in sources {
        if !context.is_empty() {
            context.push_str("\n\n");
        }
        match source.metadata.page {
            Some(page) => context.push_str(&format!("[page {}]\n", page)),
            None => context.push_str("[page ?]\n"),
        }
        context.push_str(source.page_content.trim());
    }

    if context.len() <= max_chars {
        return context;
    }
    let mut end = max_chars;
    while end > 0 && !context.is_char_boundary(end) {
        end -= 1;
    }
    context.truncate(end);
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_context_labels_pages() {
        let sources = vec![
            SourceDocument::new("  Viruses need a host.  ", Some(5)),
            SourceDocument::new("Unknown page text", None),
        ];
        let context = build_context(&sources, 10_000);
        assert_eq!(
            context,
            "[page 5]\nViruses need a host.\n\n[page ?]\nUnknown page text"
        );
    }

    #[test]
    fn test_build_context_truncates_on_char_boundary() {
        let sources = vec![SourceDocument::new("ééééé", Some(1))];
        // "[page 1]\n" is 9 bytes, each é is 2 bytes
        let context = build_context(&sources, 12);
        assert_eq!(context, "[page 1]\né");
    }

    #[tokio::test]
    async fn test_disabled_client_refuses() {
        let mut config = LlmConfig::default();
        config.enabled = false;
        let client = LlmClient::new(config);
        assert!(!client.is_available().await);
        assert!(matches!(
            client.answer_question("why?", &[]).await,
            Err(LlmError::Disabled)
        ));
    }

    #[test]
    fn test_default_prompt_placeholders() {
        let mut config = LlmConfig::default();
        config.answer_prompt = None;
        let prompt = config.get_answer_prompt();
        assert!(prompt.contains("{context}"));
        assert!(prompt.contains("{question}"));
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(LlmProvider::from_str("Groq"), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::from_str("ollama"), Some(LlmProvider::Ollama));
        assert_eq!(LlmProvider::from_str("bard"), None);
    }
}
