use hidaya_vector_store::IndexKind;
use serde::{Deserialize, Serialize};

/// Which lexical-class strategy the hybrid combiner pairs with semantic search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HybridLexical {
    /// Ranked boolean keyword search
    Lexical,
    /// Trigram similarity
    Fuzzy,
    /// Plain substring containment
    Exact,
}

/// Where semantic search finds its neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticIndex {
    /// Exact distance against the embedding store on every query
    Relational,
    /// Prebuilt in-memory flat index
    Flat,
    /// Prebuilt in-memory inverted-file index
    Ivf,
}

/// Configuration for search, hybrid ranking and batch embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Language code of the corpus' own script
    #[serde(default = "default_original_language")]
    pub original_language: String,

    /// Minimum trigram similarity for fuzzy matches (inclusive)
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f32,

    /// Multiplier for lexical-class scores in hybrid ranking
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,

    /// Multiplier for semantic scores in hybrid ranking
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Share of the final limit each hybrid half may return
    #[serde(default = "default_sub_limit_ratio")]
    pub sub_limit_ratio: f32,

    #[serde(default = "default_hybrid_lexical")]
    pub hybrid_lexical: HybridLexical,

    /// Largest accepted `limit` for a search
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Upper bound on candidates any strategy scores before truncation
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Leading words that mark a query as a question
    #[serde(default = "default_question_words")]
    pub question_words: Vec<String>,

    #[serde(default = "default_semantic_index")]
    pub semantic_index: SemanticIndex,

    /// Number of IVF lists when `semantic_index` is `ivf`
    #[serde(default = "default_ivf_lists")]
    pub ivf_lists: usize,

    /// Number of IVF lists scanned per query
    #[serde(default = "default_ivf_probes")]
    pub ivf_probes: usize,

    /// Cached search responses; 0 disables the cache
    #[serde(default)]
    pub cache_size: usize,

    /// Records per embedding batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Only embed translations by this translator
    #[serde(default)]
    pub embedding_translator: Option<String>,
}

fn default_original_language() -> String {
    "ar".to_string()
}

fn default_fuzzy_threshold() -> f32 {
    0.3
}

fn default_lexical_weight() -> f32 {
    1.0
}

fn default_semantic_weight() -> f32 {
    0.8
}

fn default_sub_limit_ratio() -> f32 {
    0.7
}

fn default_hybrid_lexical() -> HybridLexical {
    HybridLexical::Lexical
}

fn default_max_limit() -> usize {
    100
}

fn default_max_candidates() -> usize {
    1000
}

fn default_question_words() -> Vec<String> {
    ["what", "how", "why", "when", "where", "who", "which"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_semantic_index() -> SemanticIndex {
    SemanticIndex::Relational
}

fn default_ivf_lists() -> usize {
    64
}

fn default_ivf_probes() -> usize {
    8
}

fn default_batch_size() -> usize {
    100
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            original_language: default_original_language(),
            fuzzy_threshold: default_fuzzy_threshold(),
            lexical_weight: default_lexical_weight(),
            semantic_weight: default_semantic_weight(),
            sub_limit_ratio: default_sub_limit_ratio(),
            hybrid_lexical: default_hybrid_lexical(),
            max_limit: default_max_limit(),
            max_candidates: default_max_candidates(),
            question_words: default_question_words(),
            semantic_index: default_semantic_index(),
            ivf_lists: default_ivf_lists(),
            ivf_probes: default_ivf_probes(),
            cache_size: 0,
            batch_size: default_batch_size(),
            embedding_translator: None,
        }
    }
}

impl RetrievalConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.original_language.trim().is_empty() {
            return Err("original_language must not be empty".to_string());
        }

        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(format!(
                "fuzzy_threshold must be in [0.0, 1.0], got {}",
                self.fuzzy_threshold
            ));
        }

        if !self.lexical_weight.is_finite() || self.lexical_weight <= 0.0 {
            return Err(format!(
                "lexical_weight must be a finite number > 0, got {}",
                self.lexical_weight
            ));
        }

        if !self.semantic_weight.is_finite() || self.semantic_weight <= 0.0 {
            return Err(format!(
                "semantic_weight must be a finite number > 0, got {}",
                self.semantic_weight
            ));
        }

        let ratio = self.sub_limit_ratio;
        if ratio.is_nan() || ratio <= 0.0 || ratio > 1.0 {
            return Err(format!(
                "sub_limit_ratio must be in (0.0, 1.0], got {}",
                self.sub_limit_ratio
            ));
        }

        if self.max_limit == 0 {
            return Err("max_limit must be > 0".to_string());
        }

        if self.max_candidates < self.max_limit {
            return Err(format!(
                "max_candidates ({}) cannot be below max_limit ({})",
                self.max_candidates, self.max_limit
            ));
        }

        if self.semantic_index == SemanticIndex::Ivf && (self.ivf_lists == 0 || self.ivf_probes == 0)
        {
            return Err("ivf_lists and ivf_probes must be > 0".to_string());
        }

        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }

        Ok(())
    }

    /// Prebuilt structure for the configured semantic index, if any
    pub fn index_kind(&self) -> Option<IndexKind> {
        match self.semantic_index {
            SemanticIndex::Relational => None,
            SemanticIndex::Flat => Some(IndexKind::Flat),
            SemanticIndex::Ivf => Some(IndexKind::Ivf {
                lists: self.ivf_lists,
                probes: self.ivf_probes,
            }),
        }
    }

    /// Stricter matching: higher fuzzy threshold, semantic hits weigh less
    pub fn precise() -> Self {
        Self {
            fuzzy_threshold: 0.45,
            semantic_weight: 0.6,
            sub_limit_ratio: 0.5,
            ..Default::default()
        }
    }

    /// Broader matching: fuzzy pairs with semantic, each half fetches a full limit
    pub fn recall() -> Self {
        Self {
            fuzzy_threshold: 0.2,
            semantic_weight: 0.9,
            sub_limit_ratio: 1.0,
            hybrid_lexical: HybridLexical::Fuzzy,
            ..Default::default()
        }
    }
}
