use thiserror::Error;

/// Errors that can occur during embedding operations
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The requested provider cannot be constructed (missing feature, credential or model)
    #[error("Embedding backend `{provider}` is unavailable: {reason}")]
    BackendUnavailable {
        provider: &'static str,
        reason: String,
    },

    /// Failed to initialize the embedding model
    #[error("Failed to initialize embedding model: {0}")]
    ModelInitialization(String),

    /// Failed to generate embeddings
    #[error("Failed to generate embeddings: {0}")]
    EmbeddingGeneration(String),

    /// Invalid input provided to embedding backend
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A vector's length disagrees with the model's declared dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Remote provider request failed
    #[error(
        "Embedding request failed ({}): {message}",
        .status.map_or_else(|| "no status".to_string(), |code| code.to_string())
    )]
    Request {
        status: Option<u16>,
        message: String,
    },

    /// Other errors
    #[error("Embedding error: {0}")]
    Other(String),
}

impl EmbeddingError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            EmbeddingError::Request { status, .. } => {
                status.is_none_or(|code| code == 429 || code >= 500)
            }
            EmbeddingError::EmbeddingGeneration(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        EmbeddingError::Request {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Result type for embedding operations
pub type Result<T> = std::result::Result<T, EmbeddingError>;
