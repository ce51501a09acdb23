use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FhError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector: VectorConfig,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("FINHUB_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Database file, resolved against `root` when not configured.
    #[must_use]
    pub fn database_path(&self, root: &Path) -> PathBuf {
        match &self.database.path {
            Some(path) => expand_home(path),
            None => root.join("glossary.db"),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.embedding.validate()?;
        self.vector.validate()
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("finhub/config.toml"))
    }

    fn load_project(root: &Path) -> Result<Option<ConfigPatch>> {
        Self::load_patch(&root.join("config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| FhError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| FhError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.database {
            self.database.merge(patch);
        }
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
        if let Some(patch) = patch.embedding {
            self.embedding.merge(patch);
        }
        if let Some(patch) = patch.vector {
            self.vector.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("FINHUB_DATABASE_PATH") {
            self.database.path = Some(value);
        }

        if let Some(value) = env_string("FINHUB_SEARCH_KEYWORD_STRATEGY") {
            self.search.keyword_strategy = value;
        }
        if let Some(value) = env_usize("FINHUB_SEARCH_RAKE_MAX_PHRASE_WORDS")? {
            self.search.rake_max_phrase_words = value;
        }
        if let Some(value) = env_usize("FINHUB_SEARCH_DEFAULT_TOP_K")? {
            self.search.default_top_k = value;
        }
        if let Some(value) = env_f32("FINHUB_SEARCH_RELATIONAL_BOOST")? {
            self.search.relational_boost = value;
        }
        if let Some(value) = env_bool("FINHUB_SEARCH_TRUNCATE_TO_TOP_K") {
            self.search.truncate_to_top_k = value;
        }
        if let Some(value) = env_bool("FINHUB_SEARCH_PARALLEL") {
            self.search.parallel = value;
        }

        if let Some(value) = env_string("FINHUB_EMBEDDING_BACKEND") {
            self.embedding.backend = value;
        }
        if let Some(value) = env_u32("FINHUB_EMBEDDING_DIMS")? {
            self.embedding.dims = value;
        }
        if let Some(value) = env_string("FINHUB_EMBEDDING_API_URL") {
            self.embedding.api_url = value;
        }
        if let Some(value) = env_string("FINHUB_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }
        if let Some(value) = env_string("FINHUB_EMBEDDING_API_KEY_ENV") {
            self.embedding.api_key_env = value;
        }
        if let Some(value) = env_u64("FINHUB_EMBEDDING_TIMEOUT_SECS")? {
            self.embedding.timeout_secs = value;
        }

        if let Some(value) = env_string("FINHUB_VECTOR_BACKEND") {
            self.vector.backend = value;
        }
        if let Some(value) = env_string("FINHUB_VECTOR_PINECONE_HOST") {
            self.vector.pinecone_host = value;
        }
        if let Some(value) = env_string("FINHUB_VECTOR_NAMESPACE") {
            self.vector.namespace = Some(value);
        }
        if let Some(value) = env_string("FINHUB_VECTOR_API_KEY_ENV") {
            self.vector.api_key_env = value;
        }
        if let Some(value) = env_u64("FINHUB_VECTOR_TIMEOUT_SECS")? {
            self.vector.timeout_secs = value;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to `<root>/glossary.db`.
    #[serde(default)]
    pub path: Option<String>,
}

impl DatabaseConfig {
    fn merge(&mut self, patch: DatabasePatch) {
        if let Some(value) = patch.path {
            self.path = Some(value);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// `rake` (ranked phrases) or `stopwords` (token filter).
    #[serde(default)]
    pub keyword_strategy: String,
    /// Longest RAKE phrase kept, in words (0 = unlimited).
    #[serde(default)]
    pub rake_max_phrase_words: usize,
    /// Vector-search fan-out used when the caller passes no `top_k`.
    #[serde(default)]
    pub default_top_k: usize,
    /// Multiplier applied to label-cosine scores of relational matches.
    /// Values below 1.0 discount relational hits.
    #[serde(default)]
    pub relational_boost: f32,
    /// Cap the merged list at `top_k` after reranking.
    #[serde(default)]
    pub truncate_to_top_k: bool,
    /// Run the two retrieval paths and per-candidate embedding concurrently.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keyword_strategy: "rake".to_string(),
            rake_max_phrase_words: 0,
            default_top_k: 5,
            relational_boost: 0.95,
            truncate_to_top_k: false,
            parallel: true,
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.keyword_strategy {
            self.keyword_strategy = value;
        }
        if let Some(value) = patch.rake_max_phrase_words {
            self.rake_max_phrase_words = value;
        }
        if let Some(value) = patch.default_top_k {
            self.default_top_k = value;
        }
        if let Some(value) = patch.relational_boost {
            self.relational_boost = value;
        }
        if let Some(value) = patch.truncate_to_top_k {
            self.truncate_to_top_k = value;
        }
        if let Some(value) = patch.parallel {
            self.parallel = value;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.default_top_k == 0 {
            return Err(FhError::Config(
                "search.default_top_k must be greater than 0".to_string(),
            ));
        }
        if !self.relational_boost.is_finite() || self.relational_boost < 0.0 {
            return Err(FhError::Config(format!(
                "search.relational_boost must be a finite, non-negative number (got {})",
                self.relational_boost
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `hash` (offline, deterministic) or `api` (OpenAI-compatible HTTP).
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub dims: u32,
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: String,
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            dims: 384,
            api_url: "https://api.openai.com/v1/embeddings".to_string(),
            model: "text-embedding-ada-002".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    fn merge(&mut self, patch: EmbeddingPatch) {
        if let Some(value) = patch.backend {
            self.backend = value;
        }
        if let Some(value) = patch.dims {
            self.dims = value;
        }
        if let Some(value) = patch.api_url {
            self.api_url = value;
        }
        if let Some(value) = patch.model {
            self.model = value;
        }
        if let Some(value) = patch.api_key_env {
            self.api_key_env = value;
        }
        if let Some(value) = patch.timeout_secs {
            self.timeout_secs = value;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.dims == 0 {
            return Err(FhError::Config(
                "embedding.dims must be greater than 0".to_string(),
            ));
        }
        match self.backend.trim().to_lowercase().as_str() {
            "" | "hash" | "api" => Ok(()),
            other => Err(FhError::Config(format!("unknown embedding backend: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// `sqlite` (embeddings stored beside the glossary) or `pinecone`.
    #[serde(default)]
    pub backend: String,
    /// Index host, e.g. `https://glossary-abc123.svc.us-east1-gcp.pinecone.io`.
    #[serde(default)]
    pub pinecone_host: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub api_key_env: String,
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            pinecone_host: String::new(),
            namespace: None,
            api_key_env: "PINECONE_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl VectorConfig {
    fn merge(&mut self, patch: VectorPatch) {
        if let Some(value) = patch.backend {
            self.backend = value;
        }
        if let Some(value) = patch.pinecone_host {
            self.pinecone_host = value;
        }
        if let Some(value) = patch.namespace {
            self.namespace = Some(value);
        }
        if let Some(value) = patch.api_key_env {
            self.api_key_env = value;
        }
        if let Some(value) = patch.timeout_secs {
            self.timeout_secs = value;
        }
    }

    fn validate(&self) -> Result<()> {
        match self.backend.trim().to_lowercase().as_str() {
            "" | "sqlite" | "pinecone" => Ok(()),
            other => Err(FhError::Config(format!("unknown vector backend: {other}"))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    search: Option<SearchPatch>,
    embedding: Option<EmbeddingPatch>,
    vector: Option<VectorPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    keyword_strategy: Option<String>,
    rake_max_phrase_words: Option<usize>,
    default_top_k: Option<usize>,
    relational_boost: Option<f32>,
    truncate_to_top_k: Option<bool>,
    parallel: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingPatch {
    backend: Option<String>,
    dims: Option<u32>,
    api_url: Option<String>,
    model: Option<String>,
    api_key_env: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct VectorPatch {
    backend: Option<String>,
    pinecone_host: Option<String>,
    namespace: Option<String>,
    api_key_env: Option<String>,
    timeout_secs: Option<u64>,
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_u32(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|err| FhError::Config(format!("{key}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| FhError::Config(format!("{key}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|err| FhError::Config(format!("{key}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<f32>()
            .map(Some)
            .map_err(|err| FhError::Config(format!("{key}: {err}"))),
        Err(_) => Ok(None),
    }
}
