use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which embedding provider to instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Local model if compiled in and loadable, else remote if a key is set, else disabled
    #[default]
    Auto,
    /// In-process model; fails loudly when unavailable
    Local,
    /// OpenAI-compatible HTTP API; fails loudly without a credential
    Remote,
    /// No embeddings, semantic search reports nothing
    Disabled,
}

impl FromStr for BackendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(BackendMode::Auto),
            "local" | "sbert" | "fastembed" => Ok(BackendMode::Local),
            "remote" | "openai" => Ok(BackendMode::Remote),
            "disabled" | "none" | "off" => Ok(BackendMode::Disabled),
            other => Err(format!(
                "unknown embedding backend `{other}` (expected auto, local, remote or disabled)"
            )),
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendMode::Auto => "auto",
            BackendMode::Local => "local",
            BackendMode::Remote => "remote",
            BackendMode::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

/// Supported local models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocalModel {
    /// paraphrase-multilingual-MiniLM-L12-v2 (multilingual, covers the original script)
    #[default]
    #[serde(rename = "paraphrase-multilingual-MiniLM-L12-v2")]
    ParaphraseMultilingualMiniLmL12V2,
    /// all-MiniLM-L6-v2 (English, lightweight)
    #[serde(rename = "all-MiniLM-L6-v2")]
    AllMiniLmL6V2,
    /// multilingual-e5-small
    #[serde(rename = "multilingual-e5-small")]
    MultilingualE5Small,
    /// nomic-embed-text-v1.5
    #[serde(rename = "nomic-embed-text-v1.5")]
    NomicEmbedTextV15,
}

impl LocalModel {
    pub const ALL: [LocalModel; 4] = [
        LocalModel::ParaphraseMultilingualMiniLmL12V2,
        LocalModel::AllMiniLmL6V2,
        LocalModel::MultilingualE5Small,
        LocalModel::NomicEmbedTextV15,
    ];

    /// Model identifier recorded next to every stored vector.
    pub fn identifier(self) -> &'static str {
        match self {
            LocalModel::ParaphraseMultilingualMiniLmL12V2 => "paraphrase-multilingual-MiniLM-L12-v2",
            LocalModel::AllMiniLmL6V2 => "all-MiniLM-L6-v2",
            LocalModel::MultilingualE5Small => "multilingual-e5-small",
            LocalModel::NomicEmbedTextV15 => "nomic-embed-text-v1.5",
        }
    }

    pub fn dimension(self) -> usize {
        match self {
            LocalModel::ParaphraseMultilingualMiniLmL12V2
            | LocalModel::AllMiniLmL6V2
            | LocalModel::MultilingualE5Small => 384,
            LocalModel::NomicEmbedTextV15 => 768,
        }
    }
}

impl FromStr for LocalModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        LocalModel::ALL
            .into_iter()
            .find(|model| model.identifier().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown local embedding model `{wanted}`"))
    }
}

/// Declared dimension of well-known remote models.
pub fn remote_model_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-ada-002" | "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

/// Configuration for embedding backends
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Requested backend
    #[serde(default)]
    pub mode: BackendMode,

    /// Model used by the local backend
    #[serde(default)]
    pub local_model: LocalModel,

    /// Model name sent to the remote API
    #[serde(default = "default_remote_model")]
    pub remote_model: String,

    /// Explicit dimension for the remote model (also sent as `dimensions`)
    #[serde(default)]
    pub remote_dimension: Option<usize>,

    /// Remote API credential
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout for the remote API
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per remote request, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Base delay between remote retries, doubled per attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum texts per backend call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Show download progress when fetching local models
    #[serde(default)]
    pub show_download_progress: bool,
}

fn default_remote_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::default(),
            local_model: LocalModel::default(),
            remote_model: default_remote_model(),
            remote_dimension: None,
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            batch_size: default_batch_size(),
            show_download_progress: false,
        }
    }
}

// Hand-written so the credential never ends up in logs.
impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("mode", &self.mode)
            .field("local_model", &self.local_model)
            .field("remote_model", &self.remote_model)
            .field("remote_dimension", &self.remote_dimension)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("batch_size", &self.batch_size)
            .field("show_download_progress", &self.show_download_progress)
            .finish()
    }
}

impl EmbeddingConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }

        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        if self.remote_model.trim().is_empty() {
            return Err("remote_model must not be empty".to_string());
        }

        if self.remote_dimension == Some(0) {
            return Err("remote_dimension must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Dimension the remote backend will produce, if it can be known up front.
    pub fn remote_dimension(&self) -> Option<usize> {
        self.remote_dimension
            .or_else(|| remote_model_dimension(&self.remote_model))
    }

    /// Credential with surrounding whitespace removed, if non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Configuration that never constructs a backend.
    pub fn disabled() -> Self {
        Self {
            mode: BackendMode::Disabled,
            ..Default::default()
        }
    }
}
