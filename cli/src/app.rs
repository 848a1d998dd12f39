use crate::config::AppConfig;
use anyhow::{Context, Result};
use hidaya_corpus::{MemoryCorpus, RecordStore};
use hidaya_embeddings::{Embedder, select_backend};
use hidaya_pg_store::PgStore;
use hidaya_retrieval::{AnswerEngine, QueryRouter, SearchContext, SearchEngine, SearchStrategy};
use hidaya_vector_store::{IndexRegistry, MemoryVectorStore, PrebuiltIndex, VectorStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Stores, embedding backend and search services wired from one config.
pub struct App {
    config: AppConfig,
    store: Arc<dyn RecordStore>,
    vectors: Arc<dyn VectorStore>,
    postgres: Option<Arc<PgStore>>,
    embedder: OnceCell<Option<Arc<dyn Embedder>>>,
}

impl App {
    /// PostgreSQL when `database_url` is set, JSON files otherwise.
    pub async fn open(config: AppConfig) -> Result<Self> {
        let (store, vectors, postgres) = match &config.database_url {
            Some(url) => {
                let pg = Arc::new(
                    PgStore::connect(url)
                        .await
                        .context("Failed to connect to the database")?,
                );
                let store: Arc<dyn RecordStore> = pg.clone();
                let vectors: Arc<dyn VectorStore> = pg.clone();
                (store, vectors, Some(pg))
            }
            None => {
                let corpus = MemoryCorpus::load_json(&config.corpus_path)
                    .await
                    .with_context(|| {
                        format!("Failed to load corpus from {}", config.corpus_path.display())
                    })?;
                let vectors = MemoryVectorStore::open(&config.vectors_path)
                    .await
                    .with_context(|| {
                        format!(
                            "Failed to open vector store at {}",
                            config.vectors_path.display()
                        )
                    })?;
                let store: Arc<dyn RecordStore> = Arc::new(corpus);
                let vectors: Arc<dyn VectorStore> = Arc::new(vectors);
                (store, vectors, None)
            }
        };

        Ok(Self {
            config,
            store,
            vectors,
            postgres,
            embedder: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn vectors(&self) -> &Arc<dyn VectorStore> {
        &self.vectors
    }

    pub fn postgres(&self) -> Option<&Arc<PgStore>> {
        self.postgres.as_ref()
    }

    /// The active embedding backend, selected once per process.
    ///
    /// Loading a local model is blocking work, so selection runs off the
    /// async workers.
    pub async fn embedder(&self) -> Result<Option<Arc<dyn Embedder>>> {
        let embedder = self
            .embedder
            .get_or_try_init(|| async {
                let config = self.config.embedding.clone();
                let backend = tokio::task::spawn_blocking(move || select_backend(&config))
                    .await
                    .context("Embedding backend selection panicked")?
                    .context("Failed to initialize embedding backend")?;
                info!("Embedding backend: {}", backend.name());
                Ok::<_, anyhow::Error>(backend.into_embedder())
            })
            .await?;
        Ok(embedder.clone())
    }

    /// Engine with the embedding backend, loading it if needed.
    pub async fn engine(&self) -> Result<Arc<SearchEngine>> {
        let embedder = self.embedder().await?;
        self.build_engine(embedder).await
    }

    /// Engine for one search. The backend is only loaded when the strategy,
    /// or the route `auto` would take, uses embeddings.
    pub async fn engine_for(&self, query: &str, strategy: SearchStrategy) -> Result<Arc<SearchEngine>> {
        let router = QueryRouter::new(&self.config.retrieval.question_words);
        if router.needs_semantic(query, strategy) {
            self.engine().await
        } else {
            debug!("'{strategy}' search does not need embeddings; backend not loaded");
            self.build_engine(None).await
        }
    }

    async fn build_engine(&self, embedder: Option<Arc<dyn Embedder>>) -> Result<Arc<SearchEngine>> {
        let ctx = SearchContext::new(
            Arc::clone(&self.store),
            Arc::clone(&self.vectors),
            embedder.clone(),
            self.config.retrieval.clone(),
        )
        .context("Invalid retrieval configuration")?;

        if let (Some(registry), Some(embedder)) = (ctx.indexes(), embedder) {
            self.load_saved_indexes(registry, embedder.as_ref()).await;
        }
        Ok(Arc::new(SearchEngine::new(Arc::new(ctx))))
    }

    pub async fn answers(&self) -> Result<AnswerEngine> {
        Ok(AnswerEngine::new(self.engine().await?))
    }

    /// Where the index for (model, language) is saved.
    pub fn index_path(&self, model: &str, language: &str) -> PathBuf {
        index_path(&self.config.index_dir, model, language)
    }

    /// Publish saved indexes built for `embedder`. Unreadable or stale files
    /// are skipped; the registry rebuilds those pairs on demand.
    async fn load_saved_indexes(&self, registry: &IndexRegistry, embedder: &dyn Embedder) {
        let prefix = format!("{}.", file_stem(embedder.identifier()));
        let Ok(mut entries) = tokio::fs::read_dir(&self.config.index_dir).await else {
            debug!("No saved indexes in {}", self.config.index_dir.display());
            return;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".json"));
            if !matches {
                continue;
            }
            match PrebuiltIndex::load(&path, embedder.dimension()).await {
                Ok(index) if index.model() == embedder.identifier() => {
                    info!(
                        "Loaded saved {}/{} index ({} vectors)",
                        index.model(),
                        index.language(),
                        index.len()
                    );
                    if let Err(err) = registry.insert(Arc::new(index)) {
                        warn!("Could not publish {}: {err}", path.display());
                    }
                }
                Ok(_) => debug!("Skipping {}: built for another model", path.display()),
                Err(err) => warn!("Skipping saved index {}: {err}", path.display()),
            }
        }
    }
}

pub(crate) fn index_path(dir: &Path, model: &str, language: &str) -> PathBuf {
    dir.join(format!("{}.{language}.json", file_stem(model)))
}

/// Model identifiers may contain path separators (`org/model`).
fn file_stem(model: &str) -> String {
    model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
