//! # Hidaya Embeddings
//!
//! Text embedding backends for semantic search over the corpus.
//!
//! Every provider implements the [`Embedder`] contract: fixed `identifier` and
//! `dimension`, `embed_one` for a single text and `embed_many` for an ordered
//! batch where a failed item yields `None` without failing its neighbours.
//!
//! ## Backends
//!
//! - [`LocalBackend`]: in-process ONNX models via fastembed (feature `local`,
//!   enabled by default). Defaults to the multilingual
//!   `paraphrase-multilingual-MiniLM-L12-v2` model (384 dimensions).
//! - [`RemoteBackend`]: OpenAI-compatible HTTP API with timeout, retry and
//!   backoff.
//!
//! [`select_backend`] picks one according to [`BackendMode`]: `auto` prefers
//! the local model, then the remote API when a key is configured, and otherwise
//! returns [`EmbeddingBackend::Disabled`], which downstream code treats as
//! "semantic search unavailable".
//!
//! ## Example
//!
//! ```no_run
//! use hidaya_embeddings::{EmbeddingConfig, select_backend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = select_backend(&EmbeddingConfig::default())?;
//!     if let Some(embedder) = backend.into_embedder() {
//!         let vector = embedder.embed_one("patience is a virtue").await?;
//!         println!("{} -> {} dims", embedder.identifier(), vector.len());
//!     }
//!     Ok(())
//! }
//! ```

mod backend;
mod config;
mod error;
#[cfg(feature = "local")]
mod local;
mod remote;
mod selector;

pub use backend::Embedder;
pub use backend::normalize;
pub use config::BackendMode;
pub use config::EmbeddingConfig;
pub use config::LocalModel;
pub use config::remote_model_dimension;
pub use error::EmbeddingError;
pub use error::Result;
#[cfg(feature = "local")]
pub use local::LocalBackend;
pub use remote::RemoteBackend;
pub use selector::EmbeddingBackend;
pub use selector::select_backend;
pub use selector::select_backend_with;

/// Dimension of the default local model
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
