use super::Strategy;
use crate::context::SearchContext;
use crate::error::Result;
use crate::result::{MatchKind, Outcome, SearchStrategy};
use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Instant;

/// Nearest neighbors of the embedded query, scored `max(0, 1 - distance)`.
///
/// No backend, a failed query embedding, or no stored vectors all give an
/// empty outcome. A dimension mismatch or a storage failure is an error.
pub struct SemanticSearch {
    ctx: Arc<SearchContext>,
}

impl SemanticSearch {
    pub fn new(ctx: Arc<SearchContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Strategy for SemanticSearch {
    fn kind(&self) -> SearchStrategy {
        SearchStrategy::Semantic
    }

    async fn search(&self, query: &str, language: &str, limit: usize) -> Result<Outcome> {
        let Some(embedder) = self.ctx.embedder() else {
            debug!("Semantic search skipped: no embedding backend");
            return Ok(Outcome::empty("semantic"));
        };
        if limit == 0 {
            return Ok(Outcome::empty("semantic"));
        }

        let start = Instant::now();
        let vector = match embedder.embed_one(query).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!("Failed to embed query with {}: {err}", embedder.identifier());
                return Ok(Outcome::empty("semantic"));
            }
        };

        let index = self
            .ctx
            .similarity_index(embedder.as_ref(), language)
            .await?;
        let neighbors = index.query(&vector, self.ctx.capped(limit)).await?;
        let scored: Vec<_> = neighbors
            .iter()
            .map(|neighbor| (neighbor.record_id, neighbor.similarity()))
            .collect();

        debug!(
            "Semantic search with {} in {language}: {} neighbors in {:?}",
            embedder.identifier(),
            scored.len(),
            start.elapsed()
        );
        let matches = self.ctx.hydrate(&scored, MatchKind::Semantic).await?;
        Ok(Outcome::new(matches, "semantic"))
    }
}
