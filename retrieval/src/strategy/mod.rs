//! Independent query executors.
//!
//! Each strategy owns its fallback policy: a recoverable failure degrades to a
//! simpler algorithm inside the strategy and only shows up in the
//! [`Outcome::strategy_used`](crate::Outcome) label.

mod exact;
mod fuzzy;
mod lexical;
mod semantic;

pub use exact::ExactSearch;
pub use fuzzy::FuzzySearch;
pub use lexical::LexicalSearch;
pub use semantic::SemanticSearch;

use crate::error::Result;
use crate::result::{Outcome, SearchStrategy};
use async_trait::async_trait;

/// Label of a strategy that degraded to substring search
pub const EXACT_FALLBACK: &str = "exact (fallback)";

#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> SearchStrategy;

    /// Ranked matches, never more than `limit`.
    async fn search(&self, query: &str, language: &str, limit: usize) -> Result<Outcome>;
}
