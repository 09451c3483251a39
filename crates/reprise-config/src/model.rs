//! Configuration schema for replay sessions.

use serde::{Deserialize, Serialize};

/// Env var that overrides `embedding.model`.
pub const EMBEDDING_MODEL_ENV: &str = "EMBEDDING_MODEL";
/// Env var that overrides `embedding.base_url`.
pub const EMBEDDING_BASE_URL_ENV: &str = "EMBEDDING_BASE_URL";

/// Root config for a replay session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReplayConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub replay: ReplaySettings,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl ReplayConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> ReplayConfigBuilder {
        ReplayConfigBuilder::new()
    }

    /// Apply `EMBEDDING_MODEL` / `EMBEDDING_BASE_URL` overrides from the process env.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply env-style overrides from an arbitrary lookup, returning the names applied.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();
        if let Some(model) = lookup(EMBEDDING_MODEL_ENV).filter(|value| !value.trim().is_empty())
        {
            self.embedding.model = model.trim().to_string();
            applied.push(EMBEDDING_MODEL_ENV);
        }
        if let Some(base_url) =
            lookup(EMBEDDING_BASE_URL_ENV).filter(|value| !value.trim().is_empty())
        {
            self.embedding.base_url = base_url.trim().to_string();
            applied.push(EMBEDDING_BASE_URL_ENV);
        }
        applied
    }
}

/// Builder for assembling a `ReplayConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct ReplayConfigBuilder {
    config: ReplayConfig,
}

impl ReplayConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: ReplayConfig::default(),
        }
    }

    /// Replace the replay/matching settings.
    pub fn replay(mut self, replay: ReplaySettings) -> Self {
        self.config.replay = replay;
        self
    }

    /// Force a single threshold for whichever matcher is selected.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.replay.threshold = Some(threshold);
        self
    }

    /// Select the matcher explicitly.
    pub fn matcher(mut self, matcher: MatcherSelection) -> Self {
        self.config.replay.matcher = matcher;
        self
    }

    /// Replace the embedding provider configuration.
    pub fn embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.config.embedding = embedding;
        self
    }

    /// Replace the sidecar cache configuration.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Finalize and return the built `ReplayConfig`.
    pub fn build(self) -> ReplayConfig {
        self.config
    }
}

/// Which matcher the engine factory should use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatcherSelection {
    /// Pick by source extension: `.json` uses vectors, everything else text.
    #[default]
    Auto,
    /// Character-sequence ratio.
    Text,
    /// Embedding cosine similarity.
    Vector,
}

/// Threshold and matcher selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaySettings {
    #[serde(default)]
    pub matcher: MatcherSelection,
    /// Overrides both per-matcher thresholds when set.
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default = "default_text_threshold")]
    pub text_threshold: f64,
    #[serde(default = "default_vector_threshold")]
    pub vector_threshold: f64,
}

impl ReplaySettings {
    /// Threshold applied when the text matcher is active.
    pub fn effective_text_threshold(&self) -> f64 {
        self.threshold.unwrap_or(self.text_threshold)
    }

    /// Threshold applied when the vector matcher is active.
    pub fn effective_vector_threshold(&self) -> f64 {
        self.threshold.unwrap_or(self.vector_threshold)
    }
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            matcher: MatcherSelection::default(),
            threshold: None,
            text_threshold: default_text_threshold(),
            vector_threshold: default_vector_threshold(),
        }
    }
}

/// Default threshold for the character-sequence ratio.
fn default_text_threshold() -> f64 {
    0.7
}

/// Default threshold for embedding cosine similarity.
fn default_vector_threshold() -> f64 {
    0.8
}

/// OpenAI-compatible embedding endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    /// Env vars checked in order for the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Vec<String>,
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    /// Overrides the per-model batch size when set.
    #[serde(default)]
    pub max_batch_size: Option<usize>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            base_url: default_embedding_base_url(),
            api_key_env: default_api_key_env(),
            api_key_header: default_api_key_header(),
            max_batch_size: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> Vec<String> {
    vec!["EMBEDDING_API_KEY".to_string(), "ARK_API_KEY".to_string()]
}

fn default_api_key_header() -> String {
    "api-key".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Embedding sidecar cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Appended to the source file stem to name the sidecar.
    #[serde(default = "default_cache_suffix")]
    pub suffix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            suffix: default_cache_suffix(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_suffix() -> String {
    "_replay_index.json".to_string()
}
