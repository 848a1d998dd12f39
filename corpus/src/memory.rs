use crate::error::{Result, StoreError};
use crate::lexical::LexicalQuery;
use crate::model::{
    CorpusData, ParentGroup, RecordId, RecordView, TextRecord, Translation, TranslationKey,
    TranslationSource,
};
use crate::store::{RecordStore, TextScope};
use crate::text::Analyzer;
use crate::trigram;
use async_trait::async_trait;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tokio::sync::RwLock;

/// Optional search features a store may lack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub trigram: bool,
    pub full_text: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            trigram: true,
            full_text: true,
        }
    }
}

#[derive(Default)]
struct CorpusState {
    parents: BTreeMap<u32, ParentGroup>,
    records: BTreeMap<RecordId, TextRecord>,
    translations: BTreeMap<i64, Translation>,
    translation_keys: HashMap<TranslationKey, i64>,
    /// Translation ids per record, ascending
    by_record: BTreeMap<RecordId, Vec<i64>>,
    next_translation_id: i64,
}

impl CorpusState {
    fn upsert_translation(&mut self, mut translation: Translation) -> i64 {
        let key = translation.key();
        if let Some(&id) = self.translation_keys.get(&key) {
            translation.id = id;
            self.translations.insert(id, translation);
            return id;
        }
        self.next_translation_id += 1;
        let id = self.next_translation_id;
        translation.id = id;
        self.by_record
            .entry(translation.record_id)
            .or_default()
            .push(id);
        self.translation_keys.insert(key, id);
        self.translations.insert(id, translation);
        id
    }

    fn record_translations(&self, record_id: RecordId) -> impl Iterator<Item = &Translation> {
        self.by_record
            .get(&record_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.translations.get(id))
    }

    /// Searchable texts of a record within `scope`.
    fn texts<'a>(&'a self, record: &'a TextRecord, scope: &TextScope) -> Vec<&'a str> {
        match scope {
            TextScope::Original => std::iter::once(record.text_original.as_str())
                .chain(record.text_simple.as_deref())
                .collect(),
            TextScope::Translation(language) => self
                .record_translations(record.id)
                .filter(|t| &t.language == language)
                .map(|t| t.text.as_str())
                .collect(),
        }
    }

    fn view(&self, record: &TextRecord) -> RecordView {
        let parent_name = self
            .parents
            .get(&record.parent_number)
            .map(|p| p.name_simple.clone())
            .unwrap_or_default();
        let translations = self.record_translations(record.id).cloned().collect();
        RecordView {
            record: record.clone(),
            parent_name,
            translations,
        }
    }
}

/// Record store held entirely in memory.
///
/// Implements every search capability in process; capabilities can be switched
/// off to mimic storage engines without trigram or full-text support.
pub struct MemoryCorpus {
    state: RwLock<CorpusState>,
    capabilities: Capabilities,
}

impl Default for MemoryCorpus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CorpusState::default()),
            capabilities: Capabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Build a store from serialized data, validating every record.
    pub async fn from_data(data: CorpusData) -> Result<Self> {
        let corpus = Self::new();
        corpus.ingest(data).await?;
        Ok(corpus)
    }

    /// Load a JSON corpus file (see [`CorpusData`]).
    pub async fn load_json(path: &Path) -> Result<Self> {
        info!("Loading corpus from {}", path.display());
        let content = tokio::fs::read(path).await?;
        let data: CorpusData = serde_json::from_slice(&content)?;
        Self::from_data(data).await
    }

    pub async fn ingest(&self, data: CorpusData) -> Result<()> {
        let mut state = self.state.write().await;
        for parent in data.parents {
            state.parents.insert(parent.number, parent);
        }
        for record in data.records {
            record.validate()?;
            state.records.insert(record.id, record);
        }
        for translation in data.translations {
            if !state.records.contains_key(&translation.record_id) {
                return Err(StoreError::InvalidRecord {
                    id: translation.record_id,
                    reason: "translation references an unknown record".to_string(),
                });
            }
            state.upsert_translation(translation);
        }
        info!(
            "Corpus holds {} parents, {} records, {} translations",
            state.parents.len(),
            state.records.len(),
            state.translations.len()
        );
        Ok(())
    }

    pub async fn insert_parent(&self, parent: ParentGroup) {
        self.state.write().await.parents.insert(parent.number, parent);
    }

    pub async fn insert_record(&self, record: TextRecord) -> Result<()> {
        record.validate()?;
        self.state.write().await.records.insert(record.id, record);
        Ok(())
    }

    /// Insert or replace a translation by its natural key; returns its id.
    pub async fn upsert_translation(&self, translation: Translation) -> Result<i64> {
        let mut state = self.state.write().await;
        if !state.records.contains_key(&translation.record_id) {
            return Err(StoreError::InvalidRecord {
                id: translation.record_id,
                reason: "translation references an unknown record".to_string(),
            });
        }
        Ok(state.upsert_translation(translation))
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn translation_count(&self) -> usize {
        self.state.read().await.translations.len()
    }
}

fn rank_desc(scored: &mut Vec<(RecordId, f32)>, limit: usize) {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(limit);
}

#[async_trait]
impl RecordStore for MemoryCorpus {
    async fn find_containing(
        &self,
        needle: &str,
        scope: &TextScope,
        limit: usize,
    ) -> Result<Vec<RecordId>> {
        let analyzer = Analyzer::for_scope(scope);
        let needle = analyzer.fold(needle);
        let state = self.state.read().await;
        let ids: Vec<RecordId> = state
            .records
            .values()
            .filter(|record| {
                state
                    .texts(record, scope)
                    .iter()
                    .any(|text| analyzer.fold(text).contains(&needle))
            })
            .map(|record| record.id)
            .take(limit)
            .collect();
        debug!("Containment search for '{needle}' matched {} records", ids.len());
        Ok(ids)
    }

    async fn find_similar(
        &self,
        query: &str,
        scope: &TextScope,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<(RecordId, f32)>> {
        if !self.capabilities.trigram {
            return Err(StoreError::Unsupported("trigram similarity"));
        }
        let analyzer = Analyzer::for_scope(scope);
        let query = analyzer.fold(query);
        let state = self.state.read().await;
        let mut scored: Vec<(RecordId, f32)> = state
            .records
            .values()
            .filter_map(|record| {
                let best = state
                    .texts(record, scope)
                    .iter()
                    .map(|text| trigram::best_similarity(&query, &analyzer.fold(text)))
                    .fold(0.0f32, f32::max);
                (best >= threshold && best > 0.0).then_some((record.id, best))
            })
            .collect();
        rank_desc(&mut scored, limit);
        Ok(scored)
    }

    async fn find_lexical(
        &self,
        query: &LexicalQuery,
        scope: &TextScope,
        limit: usize,
    ) -> Result<Vec<(RecordId, f32)>> {
        if !self.capabilities.full_text {
            return Err(StoreError::Unsupported("full-text search"));
        }
        let state = self.state.read().await;
        let mut scored: Vec<(RecordId, f32)> = state
            .records
            .values()
            .filter_map(|record| {
                state
                    .texts(record, scope)
                    .iter()
                    .filter_map(|text| query.score(text))
                    .reduce(f32::max)
                    .map(|score| (record.id, score))
            })
            .collect();
        rank_desc(&mut scored, limit);
        Ok(scored)
    }

    async fn hydrate(&self, ids: &[RecordId]) -> Result<Vec<RecordView>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id))
            .map(|record| state.view(record))
            .collect())
    }

    async fn records(&self, ids: &[RecordId]) -> Result<Vec<TextRecord>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id))
            .cloned()
            .collect())
    }

    async fn record_ids(&self) -> Result<Vec<RecordId>> {
        Ok(self.state.read().await.records.keys().copied().collect())
    }

    async fn translations(
        &self,
        ids: &[RecordId],
        language: &str,
        translator: Option<&str>,
    ) -> Result<Vec<Translation>> {
        let wanted: BTreeSet<RecordId> = ids.iter().copied().collect();
        let guard = self.state.read().await;
        let state: &CorpusState = &guard;
        Ok(wanted
            .into_iter()
            .flat_map(|id| state.record_translations(id))
            .filter(|t| t.language == language)
            .filter(|t| translator.is_none_or(|name| t.translator == name))
            .cloned()
            .collect())
    }

    async fn parents(&self) -> Result<Vec<ParentGroup>> {
        Ok(self.state.read().await.parents.values().cloned().collect())
    }

    async fn parent(&self, number: u32) -> Result<Option<(ParentGroup, Vec<RecordView>)>> {
        let state = self.state.read().await;
        let Some(parent) = state.parents.get(&number) else {
            return Ok(None);
        };
        let mut records: Vec<&TextRecord> = state
            .records
            .values()
            .filter(|record| record.parent_number == number)
            .collect();
        records.sort_by_key(|record| record.sequence);
        let views = records.into_iter().map(|record| state.view(record)).collect();
        Ok(Some((parent.clone(), views)))
    }

    async fn record_by_reference(&self, parent: u32, sequence: u32) -> Result<Option<RecordView>> {
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .find(|record| record.parent_number == parent && record.sequence == sequence)
            .map(|record| state.view(record)))
    }

    async fn translation_sources(&self) -> Result<Vec<TranslationSource>> {
        let state = self.state.read().await;
        let sources: BTreeSet<TranslationSource> = state
            .translations
            .values()
            .map(|t| TranslationSource {
                language: t.language.clone(),
                translator: t.translator.clone(),
                source: t.source.clone(),
                license: t.license.clone(),
            })
            .collect();
        Ok(sources.into_iter().collect())
    }
}
