use crate::error::RetrievalError;
use hidaya_corpus::{RecordId, RecordView, Translation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strategy a caller asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    Exact,
    Fuzzy,
    /// Ranked boolean keyword search; `fulltext` is accepted as an alias
    #[serde(alias = "fulltext")]
    Lexical,
    Semantic,
    Hybrid,
    /// Let the query router decide
    Auto,
}

impl SearchStrategy {
    pub const ALL: [SearchStrategy; 6] = [
        SearchStrategy::Exact,
        SearchStrategy::Fuzzy,
        SearchStrategy::Lexical,
        SearchStrategy::Semantic,
        SearchStrategy::Hybrid,
        SearchStrategy::Auto,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SearchStrategy::Exact => "exact",
            SearchStrategy::Fuzzy => "fuzzy",
            SearchStrategy::Lexical => "lexical",
            SearchStrategy::Semantic => "semantic",
            SearchStrategy::Hybrid => "hybrid",
            SearchStrategy::Auto => "auto",
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchStrategy {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(SearchStrategy::Exact),
            "fuzzy" => Ok(SearchStrategy::Fuzzy),
            "lexical" | "fulltext" => Ok(SearchStrategy::Lexical),
            "semantic" => Ok(SearchStrategy::Semantic),
            "hybrid" => Ok(SearchStrategy::Hybrid),
            "auto" => Ok(SearchStrategy::Auto),
            other => Err(RetrievalError::InvalidQuery(format!(
                "unknown search strategy `{other}`"
            ))),
        }
    }
}

/// How a match was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Fuzzy,
    Lexical,
    Semantic,
    Hybrid,
}

/// A single ranked match with its display fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMatch {
    pub record_id: RecordId,

    /// Relevance score on the native scale of `match_kind`
    pub score: f32,

    pub match_kind: MatchKind,

    pub sequence: u32,

    pub parent_number: u32,

    pub parent_name: String,

    pub text_original: String,

    pub text_romanized: Option<String>,

    pub translations: Vec<Translation>,
}

impl ScoredMatch {
    pub fn from_view(view: RecordView, score: f32, match_kind: MatchKind) -> Self {
        let RecordView {
            record,
            parent_name,
            translations,
        } = view;
        Self {
            record_id: record.id,
            score,
            match_kind,
            sequence: record.sequence,
            parent_number: record.parent_number,
            parent_name,
            text_original: record.text_original,
            text_romanized: record.text_romanized,
            translations,
        }
    }

    /// `parent:sequence`
    pub fn reference(&self) -> String {
        format!("{}:{}", self.parent_number, self.sequence)
    }

    /// First translation in `language`, if attached
    pub fn translation(&self, language: &str) -> Option<&Translation> {
        self.translations.iter().find(|t| t.language == language)
    }
}

/// What one strategy produced and the label of what actually ran
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub matches: Vec<ScoredMatch>,
    pub strategy_used: String,
}

impl Outcome {
    pub fn new(matches: Vec<ScoredMatch>, strategy_used: impl Into<String>) -> Self {
        Self {
            matches,
            strategy_used: strategy_used.into(),
        }
    }

    pub fn empty(strategy_used: impl Into<String>) -> Self {
        Self::new(Vec::new(), strategy_used)
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }
}

/// Search timing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Total search time in milliseconds
    pub total_time_ms: u64,

    /// Served from the response cache
    pub cache_hit: bool,
}

/// Response of [`SearchEngine::search`](crate::SearchEngine::search)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    /// Query that produced these results
    pub query: String,

    pub results: Vec<ScoredMatch>,

    /// Number of results returned
    pub total: usize,

    /// Label of the strategy that actually ran, including fallbacks
    pub strategy_used: String,

    pub stats: SearchStats,
}

impl SearchResponse {
    pub fn new(query: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            query: query.into(),
            total: outcome.matches.len(),
            results: outcome.matches,
            strategy_used: outcome.strategy_used,
            stats: SearchStats::default(),
        }
    }

    /// Set stats
    pub fn with_stats(mut self, stats: SearchStats) -> Self {
        self.stats = stats;
        self
    }

    /// Get top N results
    pub fn top(&self, n: usize) -> &[ScoredMatch] {
        &self.results[..n.min(self.results.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hidaya_corpus::TextRecord;
    use pretty_assertions::assert_eq;

    fn sample_match(id: RecordId, score: f32) -> ScoredMatch {
        let view = RecordView {
            record: TextRecord::new(id, 2, 153, "ٱسْتَعِينُوا۟ بِٱلصَّبْرِ"),
            parent_name: "Al-Baqarah".to_string(),
            translations: vec![Translation::new(id, "en", "Sahih International", "Seek help")],
        };
        ScoredMatch::from_view(view, score, MatchKind::Exact)
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("fulltext".parse::<SearchStrategy>().unwrap(), SearchStrategy::Lexical);
        assert_eq!(" Hybrid ".parse::<SearchStrategy>().unwrap(), SearchStrategy::Hybrid);
        assert!("vector".parse::<SearchStrategy>().is_err());
        for strategy in SearchStrategy::ALL {
            assert_eq!(strategy.to_string().parse::<SearchStrategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn test_strategy_serde_alias() {
        let strategy: SearchStrategy = serde_json::from_str(r#""fulltext""#).unwrap();
        assert_eq!(strategy, SearchStrategy::Lexical);
        assert_eq!(serde_json::to_string(&strategy).unwrap(), r#""lexical""#);
    }

    #[test]
    fn test_match_from_view() {
        let m = sample_match(7, 1.0);
        assert_eq!(m.reference(), "2:153");
        assert_eq!(m.parent_name, "Al-Baqarah");
        assert_eq!(m.translation("en").map(|t| t.text.as_str()), Some("Seek help"));
        assert!(m.translation("fr").is_none());
    }

    #[test]
    fn test_response_totals() {
        let outcome = Outcome::new(vec![sample_match(1, 1.0), sample_match(2, 1.0)], "exact");
        let response = SearchResponse::new("help", outcome);
        assert_eq!(response.total, 2);
        assert_eq!(response.top(1).len(), 1);
        assert_eq!(response.top(5).len(), 2);
        assert_eq!(response.strategy_used, "exact");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["results"][0]["match_kind"], "exact");
    }
}
