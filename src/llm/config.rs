//! LLM client configuration.

use serde::{Deserialize, Serialize};

use super::prompts::DEFAULT_ANSWER_PROMPT;

/// LLM provider type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Ollama API (local, default)
    #[default]
    Ollama,
    /// OpenAI-compatible API (OpenAI, Groq, Together.ai, etc.)
    OpenAI,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "groq" | "together" => Some(Self::OpenAI),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
        }
    }
}

/// Model connection and generation settings for `ask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: LlmProvider,
    /// Base URL; each provider has its own default.
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Prompt template with `{context}` and `{question}` placeholders.
    pub answer_prompt: Option<String>,
    /// Upper bound on retrieved context sent with a question.
    pub max_content_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::built_in().with_env_overrides()
    }
}

impl LlmConfig {
    /// Compiled-in defaults, environment ignored.
    fn built_in() -> Self {
        Self {
            enabled: true,
            provider: LlmProvider::Ollama,
            endpoint: OLLAMA_ENDPOINT.to_string(),
            api_key: None,
            model: "llama3.1:8b".to_string(),
            max_tokens: 1024,
            temperature: 0.1,
            answer_prompt: None,
            max_content_chars: 12_000,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::built_in()
    }

    /// Layer `LLM_*` environment variables over this config.
    ///
    /// `LLM_ENABLED`, `LLM_PROVIDER` (ollama, openai, groq, together),
    /// `LLM_ENDPOINT`, `LLM_API_KEY`, `LLM_MODEL`, `LLM_MAX_TOKENS`,
    /// `LLM_TEMPERATURE`, `LLM_MAX_CONTENT_CHARS` and `LLM_ANSWER_PROMPT` are
    /// read. Without `LLM_PROVIDER`, a `GROQ_API_KEY` or `OPENAI_API_KEY`
    /// selects that hosted provider.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(val) = env("LLM_ENABLED") {
            self.enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }

        let endpoint = env("LLM_ENDPOINT");
        self.api_key = env("LLM_API_KEY").or(self.api_key);

        let hosted = match env("LLM_PROVIDER") {
            Some(name) => {
                let name = name.to_lowercase();
                if let Some(provider) = LlmProvider::from_str(&name) {
                    self.provider = provider;
                }
                if self.api_key.is_none() {
                    self.api_key = provider_key_var(&name).and_then(env);
                }
                Some(name)
            }
            None if self.api_key.is_none() => ["groq", "openai"].into_iter().find_map(|name| {
                let key = provider_key_var(name).and_then(env)?;
                self.api_key = Some(key);
                self.provider = LlmProvider::OpenAI;
                Some(name.to_string())
            }),
            None => None,
        };

        match (endpoint, hosted.as_deref().and_then(provider_endpoint)) {
            (Some(endpoint), _) => self.endpoint = endpoint,
            (None, Some(endpoint)) => self.endpoint = endpoint.to_string(),
            (None, None) => {}
        }

        if let Some(val) = env("LLM_MODEL") {
            self.model = val;
        }
        if let Some(n) = env_parse("LLM_MAX_TOKENS") {
            self.max_tokens = n;
        }
        if let Some(t) = env_parse("LLM_TEMPERATURE") {
            self.temperature = t;
        }
        if let Some(n) = env_parse("LLM_MAX_CONTENT_CHARS") {
            self.max_content_chars = n;
        }
        if let Some(val) = env("LLM_ANSWER_PROMPT") {
            self.answer_prompt = Some(val);
        }
        self
    }

    /// Custom answer prompt, else the built-in one.
    pub fn get_answer_prompt(&self) -> &str {
        self.answer_prompt
            .as_deref()
            .unwrap_or(DEFAULT_ANSWER_PROMPT)
    }
}

const OLLAMA_ENDPOINT: &str = "http://localhost:11434";

fn env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    env(var)?.parse().ok()
}

fn provider_key_var(provider: &str) -> Option<&'static str> {
    match provider {
        "groq" => Some("GROQ_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        _ => None,
    }
}

fn provider_endpoint(provider: &str) -> Option<&'static str> {
    match provider {
        "groq" => Some("https://api.groq.com/openai"),
        "openai" => Some("https://api.openai.com"),
        "together" => Some("https://api.together.xyz"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names() {
        assert_eq!(LlmProvider::from_str("Groq"), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::from_str("ollama"), Some(LlmProvider::Ollama));
        assert_eq!(LlmProvider::from_str("bard"), None);
    }

    #[test]
    fn test_partial_file_section_keeps_defaults() {
        let config: LlmConfig = toml::from_str("model = \"mistral\"").unwrap();
        assert_eq!(config.model, "mistral");
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.get_answer_prompt(), DEFAULT_ANSWER_PROMPT);
    }

    #[test]
    fn test_hosted_provider_endpoints() {
        assert_eq!(provider_endpoint("groq"), Some("https://api.groq.com/openai"));
        assert_eq!(provider_key_var("together"), None);
        assert!(LlmConfig::built_in().is_default());
    }
}
