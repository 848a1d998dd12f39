use super::{EXACT_FALLBACK, ExactSearch, Strategy};
use crate::context::SearchContext;
use crate::error::Result;
use crate::result::{MatchKind, Outcome, SearchStrategy};
use async_trait::async_trait;
use hidaya_corpus::{Analyzer, LexicalQuery};
use log::{debug, warn};
use std::sync::Arc;

/// Ranked boolean keyword search.
///
/// A query that does not parse, or a store that cannot evaluate it, degrades
/// to [`ExactSearch`]. Only an unreachable store is reported as an error.
pub struct LexicalSearch {
    ctx: Arc<SearchContext>,
    exact: ExactSearch,
}

impl LexicalSearch {
    pub fn new(ctx: Arc<SearchContext>) -> Self {
        Self {
            exact: ExactSearch::new(Arc::clone(&ctx)),
            ctx,
        }
    }

    async fn fallback(&self, query: &str, language: &str, limit: usize) -> Result<Outcome> {
        let matches = self.exact.matches(query, language, limit).await?;
        Ok(Outcome::new(matches, EXACT_FALLBACK))
    }
}

#[async_trait]
impl Strategy for LexicalSearch {
    fn kind(&self) -> SearchStrategy {
        SearchStrategy::Lexical
    }

    async fn search(&self, query: &str, language: &str, limit: usize) -> Result<Outcome> {
        if limit == 0 {
            return Ok(Outcome::empty("lexical"));
        }
        let scope = self.ctx.scope(language);

        let parsed = match LexicalQuery::parse(query, Analyzer::for_scope(&scope)) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("Lexical query '{query}' rejected ({err}), falling back to exact search");
                return self.fallback(query, language, limit).await;
            }
        };

        match self
            .ctx
            .store()
            .find_lexical(&parsed, &scope, self.ctx.capped(limit))
            .await
        {
            Ok(scored) => {
                debug!(
                    "Lexical search for '{}' in {language}: {} hits",
                    parsed.to_tsquery(),
                    scored.len()
                );
                let matches = self.ctx.hydrate(&scored, MatchKind::Lexical).await?;
                Ok(Outcome::new(matches, "lexical"))
            }
            Err(err) if err.is_unavailable() => Err(err.into()),
            Err(err) => {
                warn!("Lexical search failed ({err}), falling back to exact search");
                self.fallback(query, language, limit).await
            }
        }
    }
}
