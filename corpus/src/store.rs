use crate::error::Result;
use crate::lexical::LexicalQuery;
use crate::model::{ParentGroup, RecordId, RecordView, TextRecord, Translation, TranslationSource};
use async_trait::async_trait;

/// Which text fields a search runs against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextScope {
    /// The original-script and simplified-script fields of each record
    Original,
    /// Translation texts in the given language
    Translation(String),
}

impl TextScope {
    /// Searching in the corpus' own language targets the record fields,
    /// any other language targets that language's translations.
    pub fn resolve(language: &str, original_language: &str) -> Self {
        if language.eq_ignore_ascii_case(original_language) {
            TextScope::Original
        } else {
            TextScope::Translation(language.to_ascii_lowercase())
        }
    }
}

/// Read access to records and translations.
///
/// Search methods return record ids (with a native score where the method
/// ranks) in result order, already capped at `limit`. A store without a
/// capability returns [`StoreError::Unsupported`](crate::StoreError::Unsupported)
/// so callers can pick a simpler strategy.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Case-insensitive substring containment, in storage order.
    async fn find_containing(
        &self,
        needle: &str,
        scope: &TextScope,
        limit: usize,
    ) -> Result<Vec<RecordId>>;

    /// Trigram similarity at or above `threshold`, best first.
    async fn find_similar(
        &self,
        query: &str,
        scope: &TextScope,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<(RecordId, f32)>>;

    /// Boolean full-text match ranked by a coverage-weighted function, best first.
    async fn find_lexical(
        &self,
        query: &LexicalQuery,
        scope: &TextScope,
        limit: usize,
    ) -> Result<Vec<(RecordId, f32)>>;

    /// Records joined with parent display names and translations, in `ids` order.
    /// Unknown ids are skipped.
    async fn hydrate(&self, ids: &[RecordId]) -> Result<Vec<RecordView>>;

    /// Raw records in `ids` order. Unknown ids are skipped.
    async fn records(&self, ids: &[RecordId]) -> Result<Vec<TextRecord>>;

    /// Every record id in storage order.
    async fn record_ids(&self) -> Result<Vec<RecordId>>;

    /// Translations of `ids` in `language`, optionally for one translator,
    /// ordered by record then translation id.
    async fn translations(
        &self,
        ids: &[RecordId],
        language: &str,
        translator: Option<&str>,
    ) -> Result<Vec<Translation>>;

    async fn parents(&self) -> Result<Vec<ParentGroup>>;

    /// A parent group with all of its records, in sequence order.
    async fn parent(&self, number: u32) -> Result<Option<(ParentGroup, Vec<RecordView>)>>;

    async fn record_by_reference(&self, parent: u32, sequence: u32) -> Result<Option<RecordView>>;

    /// Distinct translation editions.
    async fn translation_sources(&self) -> Result<Vec<TranslationSource>>;
}
