use super::Strategy;
use crate::context::SearchContext;
use crate::error::Result;
use crate::result::{MatchKind, Outcome, ScoredMatch, SearchStrategy};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

/// Case-insensitive substring containment. Every match scores 1.0 and results
/// keep storage order.
pub struct ExactSearch {
    ctx: Arc<SearchContext>,
}

impl ExactSearch {
    pub fn new(ctx: Arc<SearchContext>) -> Self {
        Self { ctx }
    }

    /// Matches without a label; also the landing point of other strategies' fallbacks.
    pub(crate) async fn matches(
        &self,
        query: &str,
        language: &str,
        limit: usize,
    ) -> Result<Vec<ScoredMatch>> {
        let needle = strip_quotes(query);
        if needle.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let scope = self.ctx.scope(language);
        let ids = self
            .ctx
            .store()
            .find_containing(needle, &scope, self.ctx.capped(limit))
            .await?;
        debug!("Exact search for '{needle}' in {language}: {} hits", ids.len());

        let scored: Vec<_> = ids.into_iter().map(|id| (id, 1.0)).collect();
        self.ctx.hydrate(&scored, MatchKind::Exact).await
    }
}

/// `"patience"` searches for `patience`.
fn strip_quotes(query: &str) -> &str {
    let trimmed = query.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[async_trait]
impl Strategy for ExactSearch {
    fn kind(&self) -> SearchStrategy {
        SearchStrategy::Exact
    }

    async fn search(&self, query: &str, language: &str, limit: usize) -> Result<Outcome> {
        let matches = self.matches(query, language, limit).await?;
        Ok(Outcome::new(matches, "exact"))
    }
}
