//! # Hidaya PostgreSQL store
//!
//! [`PgStore`] implements both [`RecordStore`](hidaya_corpus::RecordStore) and
//! [`VectorStore`](hidaya_vector_store::VectorStore) on one database:
//!
//! - containment through `ILIKE`
//! - fuzzy search through `pg_trgm` (`similarity`, `word_similarity`)
//! - lexical search through `to_tsquery` ranked with `ts_rank_cd`
//! - nearest neighbors through pgvector's cosine distance `<=>`, optionally
//!   backed by an ivfflat index per vector dimension
//!
//! ```rust,no_run
//! use hidaya_pg_store::PgStore;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let store = PgStore::connect("postgres://localhost/hidaya").await?;
//! store.init_schema().await?;
//! store.create_vector_index(384, 100).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod records;
mod schema;
mod store;
mod vectors;

pub use store::PgStore;
