use thiserror::Error;

/// Errors raised by record stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be reached
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// A query failed while executing
    #[error("Query failed: {0}")]
    Query(String),

    /// The store does not implement the requested capability
    #[error("Operation not supported by this store: {0}")]
    Unsupported(&'static str),

    /// A record failed validation on ingestion
    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: i64, reason: String },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Conditions a caller should never try to recover from locally.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Io(_))
    }
}

/// Result type for record store operations
pub type Result<T> = std::result::Result<T, StoreError>;
