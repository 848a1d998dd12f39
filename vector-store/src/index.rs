use crate::error::{Result, VectorStoreError, check_dimension};
use crate::flat::{AnnIndex, FlatIndex};
use crate::ivf::IvfIndex;
use crate::store::VectorStore;
use crate::vector::{EmbeddingVector, Neighbor};
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Instant;

/// Nearest-neighbor lookup for one (model, language) pair.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    fn dimension(&self) -> usize;

    /// At most `k` neighbors, ascending distance, ties by record id.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}

/// Exact search straight against the embedding store.
pub struct RelationalIndex {
    store: Arc<dyn VectorStore>,
    model: String,
    language: String,
    dimension: usize,
}

impl RelationalIndex {
    pub fn new(
        store: Arc<dyn VectorStore>,
        model: impl Into<String>,
        language: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            store,
            model: model.into(),
            language: language.into(),
            dimension,
        }
    }
}

#[async_trait]
impl SimilarityIndex for RelationalIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        check_dimension(self.dimension, vector.len())?;
        self.store
            .nearest(&self.model, &self.language, vector, k)
            .await
    }
}

/// Which structure a [`PrebuiltIndex`] is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IndexKind {
    #[default]
    Flat,
    Ivf { lists: usize, probes: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "structure", rename_all = "lowercase")]
enum Structure {
    Flat(FlatIndex),
    Ivf(IvfIndex),
}

impl Structure {
    fn ann(&self) -> &dyn AnnIndex {
        match self {
            Structure::Flat(index) => index,
            Structure::Ivf(index) => index,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Structure::Flat(index) => index.validate(),
            Structure::Ivf(index) => index.validate(),
        }
    }
}

/// An in-memory ANN structure plus the table mapping positions to record ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrebuiltIndex {
    model: String,
    language: String,
    record_ids: Vec<i64>,
    structure: Structure,
}

impl PrebuiltIndex {
    /// Build from stored vectors; they must all share `dimension`.
    pub fn build(
        model: impl Into<String>,
        language: impl Into<String>,
        dimension: usize,
        vectors: &[EmbeddingVector],
        kind: IndexKind,
    ) -> Result<Self> {
        let started = Instant::now();
        let model = model.into();
        let language = language.into();

        for vector in vectors {
            vector.validate()?;
            check_dimension(dimension, vector.dimension)?;
        }

        let mut flat = FlatIndex::new(dimension);
        let values: Vec<Vec<f32>> = vectors.iter().map(|v| v.values.clone()).collect();
        flat.add(&values)?;
        let record_ids = vectors.iter().map(|v| v.record_id).collect();

        let structure = match kind {
            IndexKind::Flat => Structure::Flat(flat),
            IndexKind::Ivf { lists, probes } => {
                Structure::Ivf(IvfIndex::train(flat, lists, probes)?)
            }
        };

        info!(
            "Built {kind:?} index for {model}/{language}: {} vectors in {:?}",
            vectors.len(),
            started.elapsed()
        );
        Ok(Self {
            model,
            language,
            record_ids,
            structure,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn len(&self) -> usize {
        self.record_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_ids.is_empty()
    }

    pub fn kind(&self) -> IndexKind {
        match &self.structure {
            Structure::Flat(_) => IndexKind::Flat,
            Structure::Ivf(index) => IndexKind::Ivf {
                lists: index.lists(),
                probes: index.probes(),
            },
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_vec(self)?).await?;
        info!(
            "Saved {}/{} index ({} vectors) to {}",
            self.model,
            self.language,
            self.len(),
            path.display()
        );
        Ok(())
    }

    /// Load a saved index, requiring `dimension`.
    pub async fn load(path: &Path, dimension: usize) -> Result<Self> {
        let content = tokio::fs::read(path).await?;
        let index: PrebuiltIndex = serde_json::from_slice(&content)?;
        index.structure.validate()?;
        check_dimension(dimension, index.structure.ann().dimension())?;
        if index.record_ids.len() != index.structure.ann().len() {
            return Err(VectorStoreError::InvalidIndex(format!(
                "{} record ids for {} vectors",
                index.record_ids.len(),
                index.structure.ann().len()
            )));
        }
        Ok(index)
    }
}

#[async_trait]
impl SimilarityIndex for PrebuiltIndex {
    fn dimension(&self) -> usize {
        self.structure.ann().dimension()
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let hits = self.structure.ann().search(vector, k)?;
        let mut neighbors: Vec<Neighbor> = hits
            .into_iter()
            .filter_map(|hit| {
                self.record_ids.get(hit.position).map(|&record_id| Neighbor {
                    record_id,
                    distance: 1.0 - hit.score,
                })
            })
            .collect();
        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.record_id.cmp(&b.record_id))
        });
        Ok(neighbors)
    }
}

type RegistryKey = (String, String);

/// Prebuilt indexes per (model, language).
///
/// Indexes are immutable once published: a rebuild constructs a new one and
/// swaps the `Arc`. Two concurrent first lookups may both build; the later
/// insert wins.
pub struct IndexRegistry {
    store: Arc<dyn VectorStore>,
    kind: IndexKind,
    indexes: RwLock<HashMap<RegistryKey, Arc<PrebuiltIndex>>>,
}

impl IndexRegistry {
    pub fn new(store: Arc<dyn VectorStore>, kind: IndexKind) -> Self {
        Self {
            store,
            kind,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Published index for the pair, if any
    pub fn get(&self, model: &str, language: &str) -> Option<Arc<PrebuiltIndex>> {
        let indexes = self.indexes.read().ok()?;
        indexes
            .get(&(model.to_string(), language.to_string()))
            .cloned()
    }

    pub async fn get_or_build(
        &self,
        model: &str,
        language: &str,
        dimension: usize,
    ) -> Result<Arc<PrebuiltIndex>> {
        if let Some(index) = self.get(model, language) {
            return Ok(index);
        }
        self.rebuild(model, language, dimension).await
    }

    /// Build a fresh index from the store and publish it.
    pub async fn rebuild(
        &self,
        model: &str,
        language: &str,
        dimension: usize,
    ) -> Result<Arc<PrebuiltIndex>> {
        let vectors = self.store.vectors(model, language).await?;
        let index = Arc::new(PrebuiltIndex::build(
            model, language, dimension, &vectors, self.kind,
        )?);
        self.insert(Arc::clone(&index))?;
        Ok(index)
    }

    /// Publish an already built (or loaded) index.
    pub fn insert(&self, index: Arc<PrebuiltIndex>) -> Result<()> {
        let key = (index.model.clone(), index.language.clone());
        let mut indexes = self
            .indexes
            .write()
            .map_err(|_| VectorStoreError::Storage("index registry lock poisoned".to_string()))?;
        indexes.insert(key, index);
        Ok(())
    }

    /// Drop the published index so the next lookup rebuilds it.
    pub fn invalidate(&self, model: &str, language: &str) {
        let Ok(mut indexes) = self.indexes.write() else {
            return;
        };
        if indexes
            .remove(&(model.to_string(), language.to_string()))
            .is_some()
        {
            debug!("Invalidated index for {model}/{language}");
        }
    }
}
