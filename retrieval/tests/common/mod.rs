#![allow(dead_code)]

use async_trait::async_trait;
use hidaya_corpus::{
    LexicalQuery, MemoryCorpus, ParentGroup, RecordId, RecordStore, RecordView, StoreError,
    TextRecord, TextScope, Translation, TranslationSource,
};
use hidaya_embeddings::{Embedder, EmbeddingError, normalize};
use hidaya_retrieval::{RetrievalConfig, SearchContext, SearchEngine};
use hidaya_vector_store::{MemoryVectorStore, VectorStore};
use std::sync::Arc;

pub const SCENARIO_TEXTS: [(&str, &str); 3] = [
    ("وَاسْتَعِينُوا بِالصَّبْرِ", "patience is a virtue"),
    ("وَآتُوا الزَّكَاةَ", "charity purifies wealth"),
    ("وَأَقِيمُوا الصَّلَاةَ", "prayer establishes discipline"),
];

/// Bag-of-words embedder: each word bumps one FNV-hashed slot.
///
/// Texts sharing words land close together, which is all the tests need.
pub struct HashingEmbedder {
    identifier: String,
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self::named("hashing-test", dimension)
    }

    pub fn named(identifier: &str, dimension: usize) -> Self {
        Self {
            identifier: identifier.to_string(),
            dimension,
        }
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_one(&self, text: &str) -> hidaya_embeddings::Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }
        let mut vector = vec![0.0; self.dimension];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            vector[(fnv1a(word) % self.dimension as u64) as usize] += 1.0;
        }
        normalize(&mut vector);
        Ok(vector)
    }

    async fn embed_many(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_one(text).await.ok());
        }
        embeddings
    }
}

/// The three records of the end-to-end scenarios, ids 1..=3 in parent 2.
pub async fn scenario_corpus() -> MemoryCorpus {
    let corpus = MemoryCorpus::new();
    corpus
        .insert_parent(ParentGroup {
            number: 2,
            name_original: "البقرة".to_string(),
            name_simple: "Al-Baqarah".to_string(),
            name_translated: Some("The Cow".to_string()),
            revelation_place: Some("madinah".to_string()),
            record_count: 3,
        })
        .await;
    for (i, (original, english)) in SCENARIO_TEXTS.into_iter().enumerate() {
        let id = i as i64 + 1;
        corpus
            .insert_record(TextRecord::new(id, 2, id as u32, original))
            .await
            .unwrap();
        corpus
            .upsert_translation(Translation::new(id, "en", "Sahih International", english))
            .await
            .unwrap();
    }
    corpus
}

/// `count` records whose English text all mention prayer.
pub async fn numbered_corpus(count: usize) -> MemoryCorpus {
    let corpus = MemoryCorpus::new();
    for i in 1..=count {
        let id = i as i64;
        corpus
            .insert_record(TextRecord::new(id, 1, i as u32, format!("نص رقم {i}")))
            .await
            .unwrap();
        corpus
            .upsert_translation(Translation::new(
                id,
                "en",
                "Sahih International",
                format!("prayer establishes discipline number {i}"),
            ))
            .await
            .unwrap();
    }
    corpus
}

pub struct Fixture {
    pub engine: SearchEngine,
    pub vectors: Arc<MemoryVectorStore>,
}

pub fn engine_with(
    corpus: impl RecordStore + 'static,
    embedder: Option<Arc<dyn Embedder>>,
    config: RetrievalConfig,
) -> Fixture {
    let vectors = Arc::new(MemoryVectorStore::new());
    let store: Arc<dyn VectorStore> = vectors.clone();
    let ctx = SearchContext::new(Arc::new(corpus), store, embedder, config).unwrap();
    Fixture {
        engine: SearchEngine::new(Arc::new(ctx)),
        vectors,
    }
}

pub fn hashing() -> Option<Arc<dyn Embedder>> {
    Some(Arc::new(HashingEmbedder::new(64)))
}

/// A store whose backend is down.
pub struct UnreachableStore;

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl RecordStore for UnreachableStore {
    async fn find_containing(
        &self,
        _needle: &str,
        _scope: &TextScope,
        _limit: usize,
    ) -> hidaya_corpus::Result<Vec<RecordId>> {
        Err(down())
    }

    async fn find_similar(
        &self,
        _query: &str,
        _scope: &TextScope,
        _threshold: f32,
        _limit: usize,
    ) -> hidaya_corpus::Result<Vec<(RecordId, f32)>> {
        Err(down())
    }

    async fn find_lexical(
        &self,
        _query: &LexicalQuery,
        _scope: &TextScope,
        _limit: usize,
    ) -> hidaya_corpus::Result<Vec<(RecordId, f32)>> {
        Err(down())
    }

    async fn hydrate(&self, _ids: &[RecordId]) -> hidaya_corpus::Result<Vec<RecordView>> {
        Err(down())
    }

    async fn records(&self, _ids: &[RecordId]) -> hidaya_corpus::Result<Vec<TextRecord>> {
        Err(down())
    }

    async fn record_ids(&self) -> hidaya_corpus::Result<Vec<RecordId>> {
        Err(down())
    }

    async fn translations(
        &self,
        _ids: &[RecordId],
        _language: &str,
        _translator: Option<&str>,
    ) -> hidaya_corpus::Result<Vec<Translation>> {
        Err(down())
    }

    async fn parents(&self) -> hidaya_corpus::Result<Vec<ParentGroup>> {
        Err(down())
    }

    async fn parent(
        &self,
        _number: u32,
    ) -> hidaya_corpus::Result<Option<(ParentGroup, Vec<RecordView>)>> {
        Err(down())
    }

    async fn record_by_reference(
        &self,
        _parent: u32,
        _sequence: u32,
    ) -> hidaya_corpus::Result<Option<RecordView>> {
        Err(down())
    }

    async fn translation_sources(&self) -> hidaya_corpus::Result<Vec<TranslationSource>> {
        Err(down())
    }
}
