use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::result::{MatchKind, ScoredMatch};
use hidaya_corpus::{RecordId, RecordStore, TextScope};
use hidaya_embeddings::Embedder;
use hidaya_vector_store::{IndexRegistry, RelationalIndex, SimilarityIndex, VectorStore};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a search needs, passed in at construction.
///
/// `embedder` is `None` when no embedding backend is active; semantic search
/// then returns nothing and hybrid search runs lexical-only.
pub struct SearchContext {
    store: Arc<dyn RecordStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Option<Arc<dyn Embedder>>,
    indexes: Option<Arc<IndexRegistry>>,
    config: RetrievalConfig,
}

impl SearchContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Option<Arc<dyn Embedder>>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        config.validate().map_err(RetrievalError::Configuration)?;

        let indexes = config
            .index_kind()
            .map(|kind| Arc::new(IndexRegistry::new(Arc::clone(&vectors), kind)));

        Ok(Self {
            store,
            vectors,
            embedder,
            indexes,
            config,
        })
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn vectors(&self) -> &Arc<dyn VectorStore> {
        &self.vectors
    }

    pub fn embedder(&self) -> Option<&Arc<dyn Embedder>> {
        self.embedder.as_ref()
    }

    /// Registry of prebuilt indexes; `None` when searching relationally
    pub fn indexes(&self) -> Option<&Arc<IndexRegistry>> {
        self.indexes.as_ref()
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn semantic_available(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn scope(&self, language: &str) -> TextScope {
        TextScope::resolve(language, &self.config.original_language)
    }

    pub fn is_original_language(&self, language: &str) -> bool {
        language.eq_ignore_ascii_case(&self.config.original_language)
    }

    /// Result cap for one strategy call
    pub(crate) fn capped(&self, limit: usize) -> usize {
        limit.min(self.config.max_candidates)
    }

    /// Similarity index over `embedder`'s vectors in `language`.
    pub async fn similarity_index(
        &self,
        embedder: &dyn Embedder,
        language: &str,
    ) -> Result<Arc<dyn SimilarityIndex>> {
        let model = embedder.identifier();
        let dimension = embedder.dimension();
        match &self.indexes {
            Some(registry) => {
                let index: Arc<dyn SimilarityIndex> =
                    registry.get_or_build(model, language, dimension).await?;
                Ok(index)
            }
            None => Ok(Arc::new(RelationalIndex::new(
                Arc::clone(&self.vectors),
                model,
                language,
                dimension,
            ))),
        }
    }

    /// Join scored ids with their display fields, keeping the given order.
    pub(crate) async fn hydrate(
        &self,
        scored: &[(RecordId, f32)],
        kind: MatchKind,
    ) -> Result<Vec<ScoredMatch>> {
        if scored.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<RecordId> = scored.iter().map(|(id, _)| *id).collect();
        let scores: HashMap<RecordId, f32> = scored.iter().copied().collect();
        let views = self.store.hydrate(&ids).await?;
        Ok(views
            .into_iter()
            .map(|view| {
                let score = scores.get(&view.record.id).copied().unwrap_or_default();
                ScoredMatch::from_view(view, score, kind)
            })
            .collect())
    }
}
