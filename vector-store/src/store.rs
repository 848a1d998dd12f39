use crate::error::Result;
use crate::vector::{EmbeddingVector, Neighbor};
use async_trait::async_trait;

/// Persistence for embedding vectors, keyed by (record, model, language).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace vectors by key. Returns how many were written.
    ///
    /// Fails with a dimension mismatch when a vector disagrees with its recorded
    /// dimension or with vectors already stored for the same model.
    async fn upsert(&self, vectors: Vec<EmbeddingVector>) -> Result<usize>;

    /// Exact cosine nearest neighbors among vectors of (model, language),
    /// ascending distance, at most `k`.
    async fn nearest(
        &self,
        model: &str,
        language: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>>;

    /// Every vector of (model, language), ordered by record id.
    async fn vectors(&self, model: &str, language: &str) -> Result<Vec<EmbeddingVector>>;

    /// Number of stored vectors, optionally filtered.
    async fn count(&self, model: Option<&str>, language: Option<&str>) -> Result<usize>;
}
