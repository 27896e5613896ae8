//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `OPENAI_API_KEY`/`OPENAI_API_BASE` + `APP_*` env vars (nested keys use
//! `__`, e.g. `APP_GENERATION__MODEL`). Provides helpers to expand `~` and
//! `${VAR}` and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment
            .merge(
                Env::raw()
                    .only(&["OPENAI_API_KEY", "OPENAI_API_BASE"])
                    .map(|key| match key.as_str().to_ascii_lowercase().as_str() {
                        "openai_api_key" => "generation.api_key".into(),
                        "openai_api_base" => "generation.api_base".into(),
                        other => other.to_string().into(),
                    }),
            )
            .merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, env_name })
    }

    /// Extract and validate the typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        validate_for_env(&settings, &self.env_name)?;
        Ok(settings)
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }
}

fn validate_for_env(settings: &Settings, env: &str) -> Result<(), Error> {
    match env {
        "prod" | "production" => {
            if settings.index.backend == IndexBackend::Memory {
                return Err(Error::InvalidConfig(
                    "index.backend = \"memory\" is not persistent and is rejected in production".to_string(),
                ));
            }
        }
        "dev" | "development" | "test" | "testing" => {}
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub retrieval: RetrievalSettings,
    pub segment: SegmentSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        self.segment.validate()?;
        if self.generation.max_retries == 0 {
            return Err(Error::InvalidConfig("generation.max_retries must be at least 1".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be at least 1".to_string()));
        }
        if self.retrieval.default_limit == 0 {
            return Err(Error::InvalidConfig("retrieval.default_limit must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Lance,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    /// Directory holding one LanceDB table per topic.
    pub data_dir: String,
    /// Overrides `data_dir` with an explicit LanceDB URI when set.
    pub uri: Option<String>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { backend: IndexBackend::Lance, data_dir: "db".to_string(), uri: None }
    }
}

impl IndexSettings {
    /// Connection string: `uri` if set, else the expanded `data_dir` resolved
    /// against `base`.
    pub fn resolve_uri(&self, base: &Path) -> String {
        match &self.uri {
            Some(uri) => uri.clone(),
            None => resolve_with_base(base, &self.data_dir).to_string_lossy().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Bert,
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    /// Directory with `config.json`, `tokenizer.json`, `model.safetensors`.
    pub model_dir: String,
    pub max_len: usize,
    pub hash_dim: usize,
    /// Texts per embedder call during ingestion.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Bert,
            model_dir: "models/all-MiniLM-L6-v2".to_string(),
            max_len: 256,
            hash_dim: 384,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    /// Upper bound on the whole attempt/backoff loop of one generation.
    pub deadline_secs: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            max_retries: 3,
            request_timeout_secs: 30,
            deadline_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_limit: usize,
    /// When non-empty, ingestion is restricted to these topics.
    pub allowed_topics: Vec<String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { default_limit: 5, allowed_topics: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentSettings {
    pub chunk_size: usize,
    pub overlap: usize,
    /// Paragraphs longer than this are re-split with the fixed window.
    pub max_paragraph_chars: usize,
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self { chunk_size: 1000, overlap: 200, max_paragraph_chars: 4000 }
    }
}

impl SegmentSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.chunk_size == 0 || self.overlap == 0 || self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "segment window requires 0 < overlap < chunk_size (got overlap={}, chunk_size={})",
                self.overlap, self.chunk_size
            )));
        }
        if self.max_paragraph_chars < self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "segment.max_paragraph_chars ({}) must be >= segment.chunk_size ({})",
                self.max_paragraph_chars, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
