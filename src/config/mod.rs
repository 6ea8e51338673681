//! Configuration management.
//!
//! This module resolves the database path and loads `~/.greentrail/config.json`.
//!
//! Every setting resolves in the same order: environment variable, then the
//! config file, then a built-in default. [`ResolvedConfig::resolve`] does
//! this once per process; commands pass the result down instead of
//! re-reading the file.

use crate::embeddings::EmbeddingProviderType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";
pub const DEFAULT_COLLECTION: &str = "chatbot_memory";
pub const DEFAULT_VECTOR_SIZE: usize = 768;
pub const DEFAULT_SYNC_DELAY_SECS: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TRANSCRIBE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_HTTP_MAX_RETRIES: u32 = 2;

// ── Config file model ─────────────────────────────────────────

/// Contents of `~/.greentrail/config.json`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GreenTrailConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<EmbeddingSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_index: Option<VectorIndexSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: Option<EmbeddingProviderType>,
    /// Gemini embedding model.
    pub model: Option<String>,
    pub ollama_endpoint: Option<String>,
    pub ollama_model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorIndexSettings {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub collection: Option<String>,
    pub vector_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSettings {
    pub enabled: Option<bool>,
    pub delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpSettings {
    pub timeout_secs: Option<u64>,
    pub transcribe_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

// ── Paths ─────────────────────────────────────────────────────

/// Get the global Green Trail directory, `~/.greentrail/`.
#[must_use]
pub fn global_greentrail_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".greentrail"))
}

/// Path of the JSON config file.
///
/// # Errors
///
/// Returns `Config` if the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    global_greentrail_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or(Error::Config("Could not determine home directory".into()))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided (`--db` / `GT_DB`), use it directly
/// 2. `GREENTRAIL_DB` environment variable
/// 3. Global location: `~/.greentrail/data/greentrail.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(db_path) = std::env::var("GREENTRAIL_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_greentrail_dir().map(|dir| dir.join("data").join("greentrail.db"))
}

/// Get the default actor name recorded in audit events.
///
/// Priority: `GT_ACTOR`, then the system username, then `admin`.
#[must_use]
pub fn default_actor() -> String {
    ["GT_ACTOR", "USER"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "admin".to_string())
}

// ── Load / save ───────────────────────────────────────────────

/// Load the config file, or defaults when it does not exist.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<GreenTrailConfig> {
    load_config_from(&config_path()?)
}

/// Load a config file from an explicit path.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<GreenTrailConfig> {
    if !path.exists() {
        return Ok(GreenTrailConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Save the config file, creating its directory if needed.
///
/// # Errors
///
/// Returns `Config` if the file cannot be written.
pub fn save_config(config: &GreenTrailConfig) -> Result<()> {
    let path = config_path()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(&path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))
}

// ── Resolution ────────────────────────────────────────────────

/// Fully resolved settings.
///
/// Secrets are skipped when serializing; `gt config show` reports only
/// whether they are set.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub embedding_provider: EmbeddingProviderType,
    pub gemini_embedding_model: String,
    pub ollama_endpoint: String,
    pub ollama_model: String,
    #[serde(skip)]
    pub gemini_api_key: Option<String>,
    pub gemini_endpoint: String,
    pub generation_model: String,
    pub qdrant_url: String,
    #[serde(skip)]
    pub qdrant_api_key: Option<String>,
    pub collection: String,
    pub vector_size: usize,
    pub sync_enabled: bool,
    pub sync_delay_secs: u64,
    pub http_timeout_secs: u64,
    pub transcribe_timeout_secs: u64,
    pub http_max_retries: u32,
}

impl ResolvedConfig {
    /// Resolve from the process environment and the config file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the config file is unreadable or a variable
    /// holds an unparsable value.
    pub fn resolve() -> Result<Self> {
        let file = load_config()?;
        Self::from_sources(&file, |name| std::env::var(name).ok())
    }

    /// Resolve from a config file model and an environment lookup.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a variable holds an unparsable value.
    pub fn from_sources<F>(file: &GreenTrailConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let embeddings = file.embeddings.clone().unwrap_or_default();
        let index = file.vector_index.clone().unwrap_or_default();
        let generation = file.generation.clone().unwrap_or_default();
        let sync = file.sync.clone().unwrap_or_default();
        let http = file.http.clone().unwrap_or_default();

        let embedding_provider = match var("GT_EMBEDDING_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => embeddings.provider.unwrap_or_default(),
        };

        let vector_size = parse_var(var("GT_VECTOR_SIZE"), "GT_VECTOR_SIZE")?
            .or(index.vector_size)
            .unwrap_or(DEFAULT_VECTOR_SIZE);
        if vector_size == 0 {
            return Err(Error::Config("vector size must be positive".into()));
        }

        let sync_enabled = match var("GT_SYNC_ENABLED") {
            Some(raw) => parse_flag(&raw),
            None => sync.enabled.unwrap_or(true),
        };

        Ok(Self {
            embedding_provider,
            gemini_embedding_model: var("GEMINI_EMBEDDING_MODEL")
                .or(embeddings.model)
                .unwrap_or_else(|| DEFAULT_GEMINI_EMBEDDING_MODEL.to_string()),
            ollama_endpoint: var("OLLAMA_ENDPOINT")
                .or(embeddings.ollama_endpoint)
                .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string()),
            ollama_model: var("OLLAMA_MODEL")
                .or(embeddings.ollama_model)
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            gemini_api_key: var("GEMINI_API_KEY").or(generation.api_key),
            gemini_endpoint: var("GEMINI_ENDPOINT")
                .or(generation.endpoint)
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
            generation_model: var("GEMINI_MODEL")
                .or(generation.model)
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            qdrant_url: var("QDRANT_URL")
                .or(index.url)
                .unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            qdrant_api_key: var("QDRANT_API_KEY").or(index.api_key),
            collection: var("GT_COLLECTION")
                .or(index.collection)
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            vector_size,
            sync_enabled,
            sync_delay_secs: parse_var(var("GT_SYNC_DELAY_SECS"), "GT_SYNC_DELAY_SECS")?
                .or(sync.delay_secs)
                .unwrap_or(DEFAULT_SYNC_DELAY_SECS),
            http_timeout_secs: parse_var(var("GT_HTTP_TIMEOUT_SECS"), "GT_HTTP_TIMEOUT_SECS")?
                .or(http.timeout_secs)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            transcribe_timeout_secs: http
                .transcribe_timeout_secs
                .unwrap_or(DEFAULT_TRANSCRIBE_TIMEOUT_SECS),
            http_max_retries: parse_var(var("GT_HTTP_MAX_RETRIES"), "GT_HTTP_MAX_RETRIES")?
                .or(http.max_retries)
                .unwrap_or(DEFAULT_HTTP_MAX_RETRIES),
        })
    }

    /// Debounce window for background syncs.
    #[must_use]
    pub fn sync_delay(&self) -> Duration {
        Duration::from_secs(self.sync_delay_secs)
    }

    /// Model name of the selected embedding provider.
    #[must_use]
    pub fn embedding_model(&self) -> &str {
        match self.embedding_provider {
            EmbeddingProviderType::Gemini => &self.gemini_embedding_model,
            EmbeddingProviderType::Ollama => &self.ollama_model,
        }
    }

    /// The Gemini API key, required for generation and Gemini embeddings.
    ///
    /// # Errors
    ///
    /// Returns `Config` when no key is configured.
    pub fn require_gemini_api_key(&self) -> Result<&str> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| Error::Config("GEMINI_API_KEY is not set".into()))
    }
}

fn parse_var<T: std::str::FromStr>(raw: Option<String>, name: &str) -> Result<Option<T>> {
    raw.map(|v| {
        v.trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{name} has an invalid value: {v}")))
    })
    .transpose()
}

fn parse_flag(raw: &str) -> bool {
    !matches!(raw.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off")
}
