use crate::context::SearchContext;
use crate::embed_job::{EmbedJob, EmbedReport};
use crate::error::{Result, RetrievalError};
use crate::hybrid::HybridSearch;
use crate::result::{SearchResponse, SearchStats, SearchStrategy};
use crate::router::{QueryRouter, Route};
use crate::strategy::{ExactSearch, FuzzySearch, LexicalSearch, SemanticSearch, Strategy};
use hidaya_corpus::RecordId;
use log::{debug, info};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    language: String,
    strategy: SearchStrategy,
    limit: usize,
}

/// The search service: validates requests, routes `auto`, runs one strategy
/// and reports what ran.
pub struct SearchEngine {
    ctx: Arc<SearchContext>,
    exact: ExactSearch,
    fuzzy: FuzzySearch,
    lexical: LexicalSearch,
    semantic: SemanticSearch,
    hybrid: HybridSearch,
    router: QueryRouter,
    cache: Option<RwLock<LruCache<CacheKey, SearchResponse>>>,
}

impl SearchEngine {
    pub fn new(ctx: Arc<SearchContext>) -> Self {
        let cache = NonZeroUsize::new(ctx.config().cache_size)
            .map(|size| RwLock::new(LruCache::new(size)));
        Self {
            exact: ExactSearch::new(Arc::clone(&ctx)),
            fuzzy: FuzzySearch::new(Arc::clone(&ctx)),
            lexical: LexicalSearch::new(Arc::clone(&ctx)),
            semantic: SemanticSearch::new(Arc::clone(&ctx)),
            hybrid: HybridSearch::new(Arc::clone(&ctx)),
            router: QueryRouter::new(&ctx.config().question_words),
            cache,
            ctx,
        }
    }

    pub fn context(&self) -> &Arc<SearchContext> {
        &self.ctx
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    pub fn hybrid(&self) -> &HybridSearch {
        &self.hybrid
    }

    /// Search with an explicit strategy, or `Auto` to let the router pick.
    ///
    /// Fails on an empty query or a limit outside `1..=max_limit`. Storage and
    /// data errors propagate; everything else degrades and is reported in
    /// `strategy_used`.
    pub async fn search(
        &self,
        query: &str,
        language: &str,
        strategy: SearchStrategy,
        limit: usize,
    ) -> Result<SearchResponse> {
        let start = Instant::now();
        let query = query.trim();
        let language = language.trim().to_ascii_lowercase();
        self.validate(query, &language, limit)?;

        let key = CacheKey {
            query: query.to_string(),
            language: language.clone(),
            strategy,
            limit,
        };
        if let Some(cache) = &self.cache {
            let mut cache = cache.write().await;
            if let Some(cached) = cache.get(&key) {
                debug!("Cache hit for query: '{query}'");
                let mut response = cached.clone();
                response.stats.cache_hit = true;
                response.stats.total_time_ms = start.elapsed().as_millis() as u64;
                return Ok(response);
            }
        }

        let mut outcome = self
            .strategy(query, strategy)
            .search(query, &language, limit)
            .await?;
        outcome.matches.truncate(limit);

        let stats = SearchStats {
            total_time_ms: start.elapsed().as_millis() as u64,
            cache_hit: false,
        };
        let response = SearchResponse::new(query, outcome).with_stats(stats);

        if let Some(cache) = &self.cache {
            cache.write().await.put(key, response.clone());
        }

        info!(
            "Search '{query}' ({strategy} -> {}) returned {} results in {}ms",
            response.strategy_used, response.total, response.stats.total_time_ms
        );
        Ok(response)
    }

    /// Embed and store vectors, then drop cached responses.
    pub async fn embed_and_store(
        &self,
        record_ids: Option<&[RecordId]>,
        language: &str,
    ) -> Result<EmbedReport> {
        let report = EmbedJob::new(Arc::clone(&self.ctx))
            .embed_and_store(record_ids, language)
            .await?;
        self.clear_cache().await;
        Ok(report)
    }

    /// Clear search cache
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.write().await.clear();
            debug!("Search cache cleared");
        }
    }

    /// Get cache statistics
    pub async fn cache_stats(&self) -> CacheStats {
        match &self.cache {
            Some(cache) => {
                let cache = cache.read().await;
                CacheStats {
                    size: cache.len(),
                    capacity: cache.cap().get(),
                }
            }
            None => CacheStats::default(),
        }
    }

    pub(crate) fn validate(&self, query: &str, language: &str, limit: usize) -> Result<()> {
        if query.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }
        if language.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "language must not be empty".to_string(),
            ));
        }
        let max_limit = self.ctx.config().max_limit;
        if limit == 0 || limit > max_limit {
            return Err(RetrievalError::InvalidQuery(format!(
                "limit must be between 1 and {max_limit}, got {limit}"
            )));
        }
        Ok(())
    }

    fn strategy(&self, query: &str, requested: SearchStrategy) -> &dyn Strategy {
        match requested {
            SearchStrategy::Exact => &self.exact,
            SearchStrategy::Fuzzy => &self.fuzzy,
            SearchStrategy::Lexical => &self.lexical,
            SearchStrategy::Semantic => &self.semantic,
            SearchStrategy::Hybrid => &self.hybrid,
            SearchStrategy::Auto => {
                match self.router.route(query, self.ctx.semantic_available()).route {
                    Route::Exact => &self.exact,
                    Route::Lexical => &self.lexical,
                    Route::Hybrid => &self.hybrid,
                }
            }
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
}
