use hidaya_corpus::StoreError;
use hidaya_embeddings::EmbeddingError;
use hidaya_vector_store::VectorStoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Broad class of a failure, for callers that map errors onto responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is wrong
    BadInput,
    /// Settings or a requested provider are unusable
    Configuration,
    /// A dependency is down; retrying later may succeed
    Transient,
    /// Stored data is inconsistent
    Data,
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::InvalidQuery(_) => ErrorKind::BadInput,
            RetrievalError::Configuration(_) => ErrorKind::Configuration,
            RetrievalError::Store(err) => match err {
                StoreError::InvalidRecord { .. } | StoreError::Serialization(_) => ErrorKind::Data,
                StoreError::Unsupported(_) => ErrorKind::Configuration,
                StoreError::Unavailable(_) | StoreError::Query(_) | StoreError::Io(_) => {
                    ErrorKind::Transient
                }
            },
            RetrievalError::VectorStore(err) => match err {
                VectorStoreError::DimensionMismatch { .. }
                | VectorStoreError::InvalidIndex(_)
                | VectorStoreError::Serialization(_) => ErrorKind::Data,
                VectorStoreError::Embedding(inner) => embedding_kind(inner),
                VectorStoreError::Storage(_) | VectorStoreError::Io(_) => ErrorKind::Transient,
            },
            RetrievalError::Embedding(err) => embedding_kind(err),
        }
    }
}

fn embedding_kind(err: &EmbeddingError) -> ErrorKind {
    match err {
        EmbeddingError::BackendUnavailable { .. } | EmbeddingError::ModelInitialization(_) => {
            ErrorKind::Configuration
        }
        EmbeddingError::InvalidInput(_) => ErrorKind::BadInput,
        EmbeddingError::DimensionMismatch { .. } => ErrorKind::Data,
        _ if err.is_transient() => ErrorKind::Transient,
        _ => ErrorKind::Configuration,
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
