//! Application configuration.
//!
//! Layered, later wins: built-in defaults, the TOML file, `.env`, process
//! environment, command-line flags.

use anyhow::{Context, Result};
use hidaya_embeddings::{BackendMode, EmbeddingConfig, LocalModel};
use hidaya_retrieval::RetrievalConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given and the file exists
pub const DEFAULT_CONFIG_FILE: &str = "hidaya.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// JSON corpus file for the in-memory store
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,

    /// PostgreSQL connection string; when set, replaces the corpus and
    /// vector files
    #[serde(default, skip_serializing)]
    pub database_url: Option<String>,

    /// JSON file holding embeddings for the in-memory vector store
    #[serde(default = "default_vectors_path")]
    pub vectors_path: PathBuf,

    /// Directory of saved prebuilt indexes
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("corpus.json")
}

fn default_vectors_path() -> PathBuf {
    PathBuf::from(".hidaya/vectors.json")
}

fn default_index_dir() -> PathBuf {
    PathBuf::from(".hidaya/indexes")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            database_url: None,
            vectors_path: default_vectors_path(),
            index_dir: default_index_dir(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `path`, or `hidaya.toml` when present, then apply `.env` and the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply the recognized environment variables through `lookup`.
    ///
    /// `EMBEDDING_MODEL` names a local model when it is one, otherwise the
    /// remote model.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(mode) = lookup("EMBEDDING_BACKEND") {
            self.embedding.mode = mode
                .parse::<BackendMode>()
                .map_err(anyhow::Error::msg)
                .context("Invalid EMBEDDING_BACKEND")?;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            match model.parse::<LocalModel>() {
                Ok(local) => self.embedding.local_model = local,
                Err(_) => self.embedding.remote_model = model,
            }
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.embedding.base_url = url;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.embedding
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid [embedding] configuration")?;
        self.retrieval
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid [retrieval] configuration")?;
        Ok(())
    }
}
