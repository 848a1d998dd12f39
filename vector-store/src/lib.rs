//! # Hidaya Vector Store
//!
//! Embedding persistence and similarity search for semantic retrieval.
//!
//! ## Features
//!
//! - [`VectorStore`]: vectors keyed by (record, model, language), so
//!   re-embedding with another model never collides
//! - [`RelationalIndex`]: exact cosine kNN straight against the store
//! - [`FlatIndex`] and [`IvfIndex`]: in-memory inner-product indexes that can be
//!   saved and loaded
//! - [`IndexRegistry`]: lazily built, atomically swapped indexes per
//!   (model, language)
//!
//! Every realization rejects query vectors of the wrong dimension.
//!
//! ## Example
//!
//! ```no_run
//! use hidaya_vector_store::{EmbeddingVector, MemoryVectorStore, RelationalIndex};
//! use hidaya_vector_store::{SimilarityIndex, VectorStore};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryVectorStore::open(Path::new(".hidaya/vectors.json")).await?);
//!     store
//!         .upsert(vec![EmbeddingVector::new(1, "all-MiniLM-L6-v2", "en", vec![0.1; 384])])
//!         .await?;
//!
//!     let index = RelationalIndex::new(store, "all-MiniLM-L6-v2", "en", 384);
//!     let neighbors = index.query(&[0.1; 384], 5).await?;
//!     println!("Found {} neighbors", neighbors.len());
//!     Ok(())
//! }
//! ```

mod error;
mod flat;
mod index;
mod ivf;
mod memory;
mod store;
mod vector;

pub use error::Result;
pub use error::VectorStoreError;
pub use flat::AnnIndex;
pub use flat::FlatIndex;
pub use flat::Hit;
pub use index::IndexKind;
pub use index::IndexRegistry;
pub use index::PrebuiltIndex;
pub use index::RelationalIndex;
pub use index::SimilarityIndex;
pub use ivf::IvfIndex;
pub use memory::MemoryVectorStore;
pub use store::VectorStore;
pub use vector::EmbeddingKey;
pub use vector::EmbeddingVector;
pub use vector::Neighbor;
pub use vector::cosine_similarity;
