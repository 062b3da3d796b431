//! Configuration management for pagecite using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::llm::LlmConfig;
use crate::models::HighlightStyle;
use crate::pdf::PdfBackendType;

/// Default documents subdirectory name.
const DOCUMENTS_SUBDIR: &str = "documents";

/// Default bind address for the web server.
pub const DEFAULT_BIND: &str = "127.0.0.1:3030";

/// Port used when a bind address names only a host.
pub const DEFAULT_PORT: u16 = 3030;

/// Tunables for excerpt location and citation injection.
///
/// The fuzzy-matching thresholds are empirical; they are exposed here so
/// they can be tuned per corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Excerpts and sentences must be longer than this (chars) to be searched.
    pub min_excerpt_chars: usize,
    /// Word windows must render longer than this (chars) to be searched.
    pub min_window_chars: usize,
    /// Word-window sizes; `[6]` by default, `6..=12` for higher recall.
    pub window_sizes: Vec<usize>,
    /// Boxes on a page closer than this on both axes count as overlapping.
    pub overlap_tolerance: f64,
    /// Upper bound on distinct search strings per request.
    pub max_segments: usize,
    /// Quads kept from a single search call.
    pub max_hits_per_search: usize,
    /// Highlight color.
    pub color: String,
    /// Highlight opacity.
    pub opacity: f32,
    /// Seconds before a locate run is abandoned (0 = no limit).
    pub locate_timeout_secs: u64,
    /// Words must be longer than this to take part in fuzzy matching.
    pub fuzzy_min_word_len: usize,
    /// Words sharing a prefix of this many chars are related.
    pub fuzzy_prefix_len: usize,
    /// Absolute floor on related words for a fuzzy match.
    pub fuzzy_min_matches: usize,
    /// Fraction of the shorter word list that must be related.
    pub fuzzy_ratio: f64,
    /// Length of the leading key phrase taken from an excerpt.
    pub key_phrase_chars: usize,
    /// Key phrases must be longer than this (chars).
    pub key_phrase_min_chars: usize,
    /// Words taken from each key phrase when scanning the answer.
    pub key_words_per_phrase: usize,
    /// Chunks handed to the model as context.
    pub retrieval_top_k: usize,
    /// Target chunk size (chars) when splitting page text for retrieval.
    pub retrieval_chunk_chars: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        let style = HighlightStyle::default();
        Self {
            min_excerpt_chars: 15,
            min_window_chars: 20,
            window_sizes: vec![6],
            overlap_tolerance: 10.0,
            max_segments: 200,
            max_hits_per_search: 32,
            color: style.color,
            opacity: style.opacity,
            locate_timeout_secs: 30,
            fuzzy_min_word_len: 3,
            fuzzy_prefix_len: 4,
            fuzzy_min_matches: 2,
            fuzzy_ratio: 0.2,
            key_phrase_chars: 30,
            key_phrase_min_chars: 10,
            key_words_per_phrase: 4,
            retrieval_top_k: 4,
            retrieval_chunk_chars: 1200,
        }
    }
}

impl HighlightConfig {
    pub fn style(&self) -> HighlightStyle {
        HighlightStyle {
            color: self.color.clone(),
            opacity: self.opacity,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Directory for storing uploaded documents.
    pub documents_dir: PathBuf,
    /// Web server bind address.
    pub bind: String,
    /// PDF decoding backend.
    pub pdf_backend: PdfBackendType,
    pub highlight: HighlightConfig,
    pub llm: LlmConfig,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pagecite");

        Self {
            documents_dir: data_dir.join(DOCUMENTS_SUBDIR),
            data_dir,
            bind: DEFAULT_BIND.to_string(),
            pdf_backend: PdfBackendType::default(),
            highlight: HighlightConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            documents_dir: data_dir.join(DOCUMENTS_SUBDIR),
            data_dir,
            ..Default::default()
        }
    }

    /// Ensure data directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.documents_dir)?;
        Ok(())
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Web server bind address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// PDF backend name ("poppler" or "mupdf").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_backend: Option<String>,
    /// Excerpt location and citation tunables.
    #[serde(default, skip_serializing_if = "HighlightConfig::is_default")]
    pub highlight: HighlightConfig,
    /// LLM configuration for question answering.
    #[serde(default, skip_serializing_if = "LlmConfig::is_default")]
    pub llm: LlmConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers pagecite config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("pagecite").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        config.llm = config.llm.with_env_overrides();
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
            settings.documents_dir = settings.data_dir.join(DOCUMENTS_SUBDIR);
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        if let Some(ref name) = self.pdf_backend {
            match PdfBackendType::from_str(name) {
                Some(backend) => settings.pdf_backend = backend,
                None => tracing::warn!("Unknown pdf_backend '{}', using {}", name, settings.pdf_backend),
            }
        }
        settings.highlight = self.highlight.clone();
        settings.llm = self.llm.clone();
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory (--data-dir flag), wins over the config file.
    pub data_dir: Option<PathBuf>,
}

/// Load settings from config file (explicit or discovered) and flags.
pub async fn load_settings(options: LoadOptions) -> Settings {
    let config = match options.config_path {
        Some(ref path) => match Config::load_from_path(path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Config::default()
            }
        },
        None => Config::load().await,
    };

    let base_dir = config
        .base_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);

    if let Some(data_dir) = options.data_dir {
        settings.documents_dir = data_dir.join(DOCUMENTS_SUBDIR);
        settings.data_dir = data_dir;
    }

    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }
    settings
}
