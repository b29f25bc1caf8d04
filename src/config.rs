//! Configuration module for the knowledge-base retrieval engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `KBI_` and use double underscores
//! to separate nested levels:
//! - `KBI_EMBEDDING__PROVIDER=hashing` sets `embedding.provider`
//! - `KBI_SEARCH__OVERFETCH=8` sets `search.overfetch`
//! - `KBI_CORPUS__INFER_TAGS=true` sets `corpus.infer_tags`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the per-workspace configuration directory.
pub const CONFIG_DIR: &str = ".kbindex";

/// Smallest over-fetch multiplier accepted for filtered search.
pub const MIN_OVERFETCH: usize = 5;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the vector blob and metadata sidecar
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Workspace root directory (where .kbindex is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Corpus location and tagging
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Optional splitting of source files into chunks
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding provider settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Synchronization settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorpusConfig {
    /// Root directory scanned for `*.txt` documents
    #[serde(default = "default_corpus_root")]
    pub root: PathBuf,

    /// Infer missing country from the parent folder and category from the file name
    #[serde(default = "default_false")]
    pub infer_tags: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChunkingConfig {
    /// Split documents into sentence-packed chunks
    #[serde(default = "default_false")]
    pub enabled: bool,

    /// Upper bound on chunk length in characters
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

/// Which backend produces embeddings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI-compatible HTTP endpoint
    #[default]
    OpenAi,
    /// Local ONNX model via fastembed
    FastEmbed,
    /// Deterministic feature hashing, no network or model files
    Hashing,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// Model name (provider specific)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector width; must match what the model produces
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Texts per embedding call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// Append and persist after this many newly embedded chunks
    #[serde(default = "default_persist_every")]
    pub persist_every: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// Results returned when no limit is given
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Candidate multiplier applied before metadata filtering (minimum 5)
    #[serde(default = "default_overfetch")]
    pub overfetch: usize,

    /// Characters of content kept in each metadata record
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all targets
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `sync = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from(".kbindex/index")
}
fn default_corpus_root() -> PathBuf {
    PathBuf::from("sources/cleaned_text_parsed")
}
fn default_false() -> bool {
    false
}
fn default_max_chunk_chars() -> usize {
    1500
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dimension() -> usize {
    crate::vector::VECTOR_DIMENSION_1536
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> usize {
    3
}
fn default_batch_size() -> usize {
    64
}
fn default_persist_every() -> usize {
    64
}
fn default_limit() -> usize {
    3
}
fn default_overfetch() -> usize {
    MIN_OVERFETCH
}
fn default_preview_chars() -> usize {
    1000
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            workspace_root: None,
            corpus: CorpusConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            sync: SyncConfig::default(),
            search: SearchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_corpus_root(),
            infer_tags: false,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            persist_every: default_persist_every(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            overfetch: default_overfetch(),
            preview_chars: default_preview_chars(),
        }
    }
}

impl SearchConfig {
    /// Over-fetch multiplier, never below [`MIN_OVERFETCH`].
    pub fn effective_overfetch(&self) -> usize {
        self.overfetch.max(MIN_OVERFETCH)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Self::load_from(config_path).map(|mut settings| {
            if settings.workspace_root.is_none() {
                settings.workspace_root = Self::workspace_root();
            }
            settings
        })
    }

    /// Load configuration from a specific file, still honouring `KBI_` variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels, single underscore stays
            .merge(Env::prefixed("KBI_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the workspace config by looking for .kbindex from the current directory up
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join("settings.toml"))
    }

    /// Get the workspace root directory (where .kbindex is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }

        None
    }

    /// Resolve a configured path against the workspace root when relative
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Absolute location of the index artifacts
    pub fn resolved_index_path(&self) -> PathBuf {
        self.resolve(&self.index_path)
    }

    /// Absolute location of the corpus root
    pub fn resolved_corpus_root(&self) -> PathBuf {
        self.resolve(&self.corpus.root)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let settings = Settings::default();
        let body = toml::to_string_pretty(&settings)?;
        let content = format!(
            "# kbindex settings\n\
             #\n\
             # Relative paths are resolved against the directory holding .kbindex/.\n\
             # Any key can be overridden with KBI_<SECTION>__<KEY>, e.g. KBI_EMBEDDING__PROVIDER=hashing\n\n\
             {body}"
        );

        std::fs::create_dir_all(CONFIG_DIR)?;
        std::fs::write(&config_path, content)?;

        Ok(config_path)
    }
}
