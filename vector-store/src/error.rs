use thiserror::Error;

/// Errors that can occur during vector store operations
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// A vector's length disagrees with the dimension it is checked against
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A persisted index is malformed
    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    /// The backing storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] hidaya_embeddings::EmbeddingError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for vector store operations
pub type Result<T> = std::result::Result<T, VectorStoreError>;

pub(crate) fn check_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(VectorStoreError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
