use crate::result::SearchStrategy;
use log::debug;
use regex_lite::Regex;
use std::sync::LazyLock;

static QUOTED_PHRASE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"^\s*"[^"]+"\s*$"#).ok());

/// Strategies `auto` can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Exact,
    Lexical,
    Hybrid,
}

impl From<Route> for SearchStrategy {
    fn from(route: Route) -> Self {
        match route {
            Route::Exact => SearchStrategy::Exact,
            Route::Lexical => SearchStrategy::Lexical,
            Route::Hybrid => SearchStrategy::Hybrid,
        }
    }
}

/// The router's pick and the rule that made it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub route: Route,
    pub reason: &'static str,
}

/// Picks a strategy for `auto` searches from cheap query heuristics.
///
/// Rules, first match wins:
/// 1. a quoted phrase, or at most two tokens: exact
/// 2. starts with a question word: hybrid when semantic search is available,
///    lexical otherwise
/// 3. lexical
#[derive(Debug, Clone)]
pub struct QueryRouter {
    question_words: Vec<String>,
}

impl QueryRouter {
    pub fn new(question_words: &[String]) -> Self {
        Self {
            question_words: question_words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn route(&self, query: &str, semantic_available: bool) -> RouteDecision {
        let decision = self.decide(query, semantic_available);
        debug!(
            "Routed '{query}' to {} ({})",
            SearchStrategy::from(decision.route),
            decision.reason
        );
        decision
    }

    /// Whether searching `query` with `strategy` would use embeddings if a
    /// backend were available. Lets callers skip loading a backend.
    pub fn needs_semantic(&self, query: &str, strategy: SearchStrategy) -> bool {
        match strategy {
            SearchStrategy::Semantic | SearchStrategy::Hybrid => true,
            SearchStrategy::Exact | SearchStrategy::Fuzzy | SearchStrategy::Lexical => false,
            SearchStrategy::Auto => self.decide(query.trim(), true).route == Route::Hybrid,
        }
    }

    fn decide(&self, query: &str, semantic_available: bool) -> RouteDecision {
        let is_quoted = QUOTED_PHRASE
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(query));
        if is_quoted {
            return RouteDecision {
                route: Route::Exact,
                reason: "quoted phrase",
            };
        }

        let tokens: Vec<&str> = query.split_whitespace().collect();
        if tokens.len() <= 2 {
            return RouteDecision {
                route: Route::Exact,
                reason: "short query",
            };
        }

        let is_question = tokens.first().is_some_and(|token| {
            let word = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            self.question_words.contains(&word)
        });
        if is_question {
            return if semantic_available {
                RouteDecision {
                    route: Route::Hybrid,
                    reason: "question",
                }
            } else {
                RouteDecision {
                    route: Route::Lexical,
                    reason: "question without semantic backend",
                }
            };
        }

        RouteDecision {
            route: Route::Lexical,
            reason: "default",
        }
    }
}
