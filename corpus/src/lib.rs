//! # Hidaya Corpus
//!
//! Records (verses), parent groups (chapters) and translations, plus the
//! read-only [`RecordStore`] contract the search core queries.
//!
//! The crate also owns the text machinery every store realization shares:
//!
//! - [`Analyzer`]: language-aware folding, stopwords and stemming
//! - [`trigram`]: `pg_trgm`-compatible similarity
//! - [`LexicalQuery`]: the boolean keyword query language
//!
//! [`MemoryCorpus`] implements the whole contract in memory and is seeded from
//! a JSON [`CorpusData`] file.

mod error;
mod lexical;
mod memory;
mod model;
mod store;
mod text;
pub mod trigram;

pub use error::Result;
pub use error::StoreError;
pub use lexical::LexicalNode;
pub use lexical::LexicalQuery;
pub use lexical::QueryParseError;
pub use lexical::Term;
pub use memory::Capabilities;
pub use memory::MemoryCorpus;
pub use model::CorpusData;
pub use model::ParentGroup;
pub use model::RecordId;
pub use model::RecordView;
pub use model::TextRecord;
pub use model::Translation;
pub use model::TranslationKey;
pub use model::TranslationOrigin;
pub use model::TranslationSource;
pub use store::RecordStore;
pub use store::TextScope;
pub use text::Analyzer;
pub use text::fold_original_script;
