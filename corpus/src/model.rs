use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};

/// Stable integer identity of a record
pub type RecordId = i64;

/// A chapter: the group records belong to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParentGroup {
    /// Position of the group in the corpus (1-based)
    pub number: u32,

    /// Name in the original script
    pub name_original: String,

    /// Display name in simplified / romanized form
    pub name_simple: String,

    /// Translated name, when known
    #[serde(default)]
    pub name_translated: Option<String>,

    /// Place of revelation, when known
    #[serde(default)]
    pub revelation_place: Option<String>,

    /// Number of records declared for the group
    #[serde(default)]
    pub record_count: u32,
}

/// One addressable unit of source text (a verse)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextRecord {
    pub id: RecordId,

    /// Number of the parent group
    pub parent_number: u32,

    /// Position inside the parent group (1-based)
    pub sequence: u32,

    /// Text in the original script, with diacritics
    pub text_original: String,

    /// Simplified script without diacritics
    #[serde(default)]
    pub text_simple: Option<String>,

    /// Romanized rendering
    #[serde(default)]
    pub text_romanized: Option<String>,
}

impl TextRecord {
    pub fn new(
        id: RecordId,
        parent_number: u32,
        sequence: u32,
        text_original: impl Into<String>,
    ) -> Self {
        Self {
            id,
            parent_number,
            sequence,
            text_original: text_original.into(),
            text_simple: None,
            text_romanized: None,
        }
    }

    /// Human-readable `parent:sequence` reference
    pub fn reference(&self) -> String {
        format!("{}:{}", self.parent_number, self.sequence)
    }

    pub fn validate(&self) -> Result<()> {
        if self.text_original.trim().is_empty() {
            return Err(StoreError::InvalidRecord {
                id: self.id,
                reason: "original-script text is empty".to_string(),
            });
        }
        if self.sequence == 0 || self.parent_number == 0 {
            return Err(StoreError::InvalidRecord {
                id: self.id,
                reason: "parent number and sequence are 1-based".to_string(),
            });
        }
        Ok(())
    }
}

/// A localized rendering of a record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Translation {
    /// Assigned by the store
    #[serde(default)]
    pub id: i64,

    pub record_id: RecordId,

    /// Language code, e.g. `en`
    pub language: String,

    pub translator: String,

    /// Stable id of the upstream translation resource
    #[serde(default)]
    pub resource_id: Option<i64>,

    pub text: String,

    #[serde(default)]
    pub license: Option<String>,

    #[serde(default)]
    pub source: Option<String>,
}

impl Translation {
    pub fn new(
        record_id: RecordId,
        language: impl Into<String>,
        translator: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            record_id,
            language: language.into(),
            translator: translator.into(),
            resource_id: None,
            text: text.into(),
            license: None,
            source: None,
        }
    }

    pub fn with_resource_id(mut self, resource_id: i64) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    pub fn key(&self) -> TranslationKey {
        let origin = match self.resource_id {
            Some(id) => TranslationOrigin::Resource(id),
            None => TranslationOrigin::Translator(self.translator.clone()),
        };
        TranslationKey {
            record_id: self.record_id,
            language: self.language.clone(),
            origin,
        }
    }
}

/// Natural key of a translation.
///
/// A stable upstream resource id wins over the free-text translator name, so a
/// renamed translator does not create a second copy of the same translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TranslationKey {
    pub record_id: RecordId,
    pub language: String,
    pub origin: TranslationOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TranslationOrigin {
    Resource(i64),
    Translator(String),
}

/// A distinct translation edition available in the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct TranslationSource {
    pub language: String,
    pub translator: String,
    pub source: Option<String>,
    pub license: Option<String>,
}

/// A record joined with its parent's display name and all its translations
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecordView {
    pub record: TextRecord,
    pub parent_name: String,
    pub translations: Vec<Translation>,
}

/// Serialized form of a whole corpus, used to seed in-memory stores
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusData {
    #[serde(default)]
    pub parents: Vec<ParentGroup>,
    #[serde(default)]
    pub records: Vec<TextRecord>,
    #[serde(default)]
    pub translations: Vec<Translation>,
}
