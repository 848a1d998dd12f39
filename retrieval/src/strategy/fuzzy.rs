use super::{EXACT_FALLBACK, ExactSearch, Strategy};
use crate::context::SearchContext;
use crate::error::Result;
use crate::result::{MatchKind, Outcome, SearchStrategy};
use async_trait::async_trait;
use hidaya_corpus::StoreError;
use log::{debug, warn};
use std::sync::Arc;

/// Trigram similarity above the configured threshold, best first.
///
/// Stores without a similarity operator degrade to [`ExactSearch`].
pub struct FuzzySearch {
    ctx: Arc<SearchContext>,
    exact: ExactSearch,
}

impl FuzzySearch {
    pub fn new(ctx: Arc<SearchContext>) -> Self {
        Self {
            exact: ExactSearch::new(Arc::clone(&ctx)),
            ctx,
        }
    }
}

#[async_trait]
impl Strategy for FuzzySearch {
    fn kind(&self) -> SearchStrategy {
        SearchStrategy::Fuzzy
    }

    async fn search(&self, query: &str, language: &str, limit: usize) -> Result<Outcome> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Outcome::empty("fuzzy"));
        }
        let scope = self.ctx.scope(language);
        let threshold = self.ctx.config().fuzzy_threshold;

        match self
            .ctx
            .store()
            .find_similar(query, &scope, threshold, self.ctx.capped(limit))
            .await
        {
            Ok(scored) => {
                debug!(
                    "Fuzzy search for '{query}' (threshold {threshold}): {} hits",
                    scored.len()
                );
                let matches = self.ctx.hydrate(&scored, MatchKind::Fuzzy).await?;
                Ok(Outcome::new(matches, "fuzzy"))
            }
            Err(StoreError::Unsupported(capability)) => {
                warn!("Fuzzy search unavailable ({capability}), falling back to exact search");
                let matches = self.exact.matches(query, language, limit).await?;
                Ok(Outcome::new(matches, EXACT_FALLBACK))
            }
            Err(err) => Err(err.into()),
        }
    }
}
