use crate::config::HybridLexical;
use crate::context::SearchContext;
use crate::error::Result;
use crate::result::{MatchKind, Outcome, ScoredMatch, SearchStrategy};
use crate::strategy::{
    EXACT_FALLBACK, ExactSearch, FuzzySearch, LexicalSearch, SemanticSearch, Strategy,
};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Relative slack when rounding `limit * sub_limit_ratio`.
const RATIO_TOLERANCE: f64 = 1e-6;

/// Lexical-class search and semantic search merged into one ranking.
///
/// The two score scales are not normalized against each other. Lexical
/// matches keep their native score (times `lexical_weight`); semantic matches
/// are scaled by `semantic_weight` and either added or used to raise an
/// existing lexical entry. Both weights are configuration.
pub struct HybridSearch {
    ctx: Arc<SearchContext>,
    lexical: Box<dyn Strategy>,
    semantic: SemanticSearch,
}

impl HybridSearch {
    pub fn new(ctx: Arc<SearchContext>) -> Self {
        let lexical: Box<dyn Strategy> = match ctx.config().hybrid_lexical {
            HybridLexical::Lexical => Box::new(LexicalSearch::new(Arc::clone(&ctx))),
            HybridLexical::Fuzzy => Box::new(FuzzySearch::new(Arc::clone(&ctx))),
            HybridLexical::Exact => Box::new(ExactSearch::new(Arc::clone(&ctx))),
        };
        Self {
            semantic: SemanticSearch::new(Arc::clone(&ctx)),
            lexical,
            ctx,
        }
    }

    /// Per-half cap: `ceil(limit * sub_limit_ratio)`, at least 1.
    ///
    /// The ratio is stored as `f32`, so `0.3` arrives as `0.30000001`. Products
    /// within float noise of an integer count as that integer.
    pub fn sub_limit(&self, limit: usize) -> usize {
        let ratio = f64::from(self.ctx.config().sub_limit_ratio);
        let raw = limit as f64 * ratio;
        let nearest = raw.round();
        let sub = if (raw - nearest).abs() <= RATIO_TOLERANCE * raw.max(1.0) {
            nearest
        } else {
            raw.ceil()
        };
        (sub as usize).clamp(1, limit.max(1))
    }

    /// Run with different texts for each half.
    pub async fn search_split(
        &self,
        lexical_query: &str,
        semantic_query: &str,
        language: &str,
        limit: usize,
    ) -> Result<Outcome> {
        if limit == 0 {
            return Ok(Outcome::empty("hybrid"));
        }
        let sub_limit = self.sub_limit(limit);

        let lexical = self.lexical.search(lexical_query, language, sub_limit).await?;
        let semantic_available = self.ctx.semantic_available();
        let semantic = if semantic_available {
            self.semantic
                .search(semantic_query, language, sub_limit)
                .await?
        } else {
            Outcome::empty("semantic")
        };

        debug!(
            "Hybrid merge: {} {} + {} semantic (sub-limit {sub_limit})",
            lexical.len(),
            lexical.strategy_used,
            semantic.len()
        );

        let label = label(semantic_available, lexical.strategy_used == EXACT_FALLBACK);
        let matches = self.merge(lexical.matches, semantic.matches, limit);
        Ok(Outcome::new(matches, label))
    }

    fn merge(
        &self,
        lexical: Vec<ScoredMatch>,
        semantic: Vec<ScoredMatch>,
        limit: usize,
    ) -> Vec<ScoredMatch> {
        let config = self.ctx.config();
        let mut merged: Vec<ScoredMatch> = Vec::with_capacity(lexical.len() + semantic.len());
        let mut positions: HashMap<i64, usize> = HashMap::new();

        for mut m in lexical {
            if positions.contains_key(&m.record_id) {
                continue;
            }
            m.score *= config.lexical_weight;
            m.match_kind = MatchKind::Hybrid;
            positions.insert(m.record_id, merged.len());
            merged.push(m);
        }

        for mut m in semantic {
            let weighted = m.score * config.semantic_weight;
            match positions.get(&m.record_id) {
                Some(&position) => {
                    let existing = &mut merged[position];
                    existing.score = existing.score.max(weighted);
                }
                None => {
                    m.score = weighted;
                    m.match_kind = MatchKind::Hybrid;
                    positions.insert(m.record_id, merged.len());
                    merged.push(m);
                }
            }
        }

        merged.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.record_id.cmp(&b.record_id))
        });
        merged.truncate(limit);
        merged
    }
}

fn label(semantic_available: bool, lexical_degraded: bool) -> &'static str {
    match (semantic_available, lexical_degraded) {
        (true, false) => "hybrid",
        (true, true) => "hybrid (exact fallback)",
        (false, false) => "hybrid (lexical only)",
        (false, true) => "hybrid (lexical only, exact fallback)",
    }
}

#[async_trait]
impl Strategy for HybridSearch {
    fn kind(&self) -> SearchStrategy {
        SearchStrategy::Hybrid
    }

    async fn search(&self, query: &str, language: &str, limit: usize) -> Result<Outcome> {
        self.search_split(query, query, language, limit).await
    }
}
