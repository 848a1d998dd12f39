/*!
# Hidaya Retrieval

Search and ranking core over a verse corpus:
- **Exact**: case-insensitive substring containment
- **Fuzzy**: trigram similarity with a threshold
- **Lexical**: ranked boolean keyword search (`AND`, `OR`, `-word`, `"phrases"`)
- **Semantic**: nearest neighbors of the embedded query
- **Hybrid**: lexical-class and semantic results merged with configurable weights

## Architecture

```text
Query
  └─> SearchEngine (validation, cache)
        ├─> QueryRouter (auto only)
        └─> Strategy
              ├─> Exact
              ├─> Fuzzy ───────> Exact (fallback)
              ├─> Lexical ─────> Exact (fallback)
              ├─> Semantic ────> empty when no backend
              └─> Hybrid = Lexical-class + Semantic, merged
```

Fallbacks live inside each strategy and surface only in `strategy_used`.

## Example

```rust,no_run
use hidaya_corpus::MemoryCorpus;
use hidaya_retrieval::{RetrievalConfig, SearchContext, SearchEngine, SearchStrategy};
use hidaya_vector_store::MemoryVectorStore;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let corpus = MemoryCorpus::load_json(Path::new("corpus.json")).await?;
    let ctx = SearchContext::new(
        Arc::new(corpus),
        Arc::new(MemoryVectorStore::new()),
        None,
        RetrievalConfig::default(),
    )?;
    let engine = SearchEngine::new(Arc::new(ctx));

    let response = engine
        .search("patience in hardship", "en", SearchStrategy::Auto, 10)
        .await?;
    for m in response.top(5) {
        println!("{} ({:.2}) via {}", m.reference(), m.score, response.strategy_used);
    }
    Ok(())
}
```
*/

mod config;
mod context;
mod embed_job;
mod engine;
mod error;
mod hybrid;
mod qa;
mod result;
mod router;
pub mod strategy;

pub use config::{HybridLexical, RetrievalConfig, SemanticIndex};
pub use context::SearchContext;
pub use embed_job::{EmbedJob, EmbedReport};
pub use engine::{CacheStats, SearchEngine};
pub use error::{ErrorKind, Result, RetrievalError};
pub use hybrid::HybridSearch;
pub use qa::{Answer, AnswerEngine, Citation};
pub use result::{MatchKind, Outcome, ScoredMatch, SearchResponse, SearchStats, SearchStrategy};
pub use router::{QueryRouter, Route, RouteDecision};
