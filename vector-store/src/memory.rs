use crate::error::{Result, check_dimension};
use crate::store::VectorStore;
use crate::vector::{EmbeddingKey, EmbeddingVector, Neighbor, closest, cosine_similarity};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// In-memory vector store, optionally persisted to a JSON file.
pub struct MemoryVectorStore {
    path: Option<PathBuf>,
    vectors: RwLock<BTreeMap<EmbeddingKey, EmbeddingVector>>,
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVectorStore {
    /// A store that lives only as long as the process.
    pub fn new() -> Self {
        Self {
            path: None,
            vectors: RwLock::new(BTreeMap::new()),
        }
    }

    /// Open a store persisted at `path`, loading existing vectors if the file exists.
    pub async fn open(path: &Path) -> Result<Self> {
        info!("Opening vector store at {}", path.display());

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let vectors = if tokio::fs::try_exists(path).await? {
            Self::load_from_disk(path).await?
        } else {
            BTreeMap::new()
        };

        info!("Vector store holds {} vectors", vectors.len());
        Ok(Self {
            path: Some(path.to_path_buf()),
            vectors: RwLock::new(vectors),
        })
    }

    async fn load_from_disk(path: &Path) -> Result<BTreeMap<EmbeddingKey, EmbeddingVector>> {
        let content = tokio::fs::read(path).await?;
        let stored: Vec<EmbeddingVector> = serde_json::from_slice(&content)?;
        let mut vectors = BTreeMap::new();
        for vector in stored {
            vector.validate()?;
            vectors.insert(vector.key(), vector);
        }
        Ok(vectors)
    }

    async fn save_to_disk(&self, vectors: &BTreeMap<EmbeddingKey, EmbeddingVector>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let stored: Vec<&EmbeddingVector> = vectors.values().collect();
        let content = serde_json::to_vec(&stored)?;
        // Write then rename so readers never observe a half-written file.
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, content).await?;
        if let Err(err) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }
}

/// Dimension already established for `model`, if any vector of it is stored.
fn model_dimension(vectors: &BTreeMap<EmbeddingKey, EmbeddingVector>, model: &str) -> Option<usize> {
    vectors
        .values()
        .find(|vector| vector.model == model)
        .map(|vector| vector.dimension)
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, vectors: Vec<EmbeddingVector>) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let mut stored = self.vectors.write().await;

        // Validate the whole batch before touching the map.
        let mut declared: BTreeMap<&str, usize> = BTreeMap::new();
        for vector in &vectors {
            vector.validate()?;
            let expected = match declared.get(vector.model.as_str()) {
                Some(&dimension) => dimension,
                None => {
                    let dimension =
                        model_dimension(&stored, &vector.model).unwrap_or(vector.dimension);
                    declared.insert(vector.model.as_str(), dimension);
                    dimension
                }
            };
            check_dimension(expected, vector.dimension)?;
        }

        let written = vectors.len();
        let mut replaced = Vec::with_capacity(written);
        for vector in vectors {
            let key = vector.key();
            let previous = stored.insert(key.clone(), vector);
            replaced.push((key, previous));
        }
        if let Err(err) = self.save_to_disk(&stored).await {
            // Undo in reverse so repeated keys in one batch restore the oldest value.
            for (key, previous) in replaced.into_iter().rev() {
                match previous {
                    Some(vector) => stored.insert(key, vector),
                    None => stored.remove(&key),
                };
            }
            warn!("Vector store not persisted; batch of {written} rolled back: {err}");
            return Err(err);
        }

        debug!("Upserted {written} vectors");
        Ok(written)
    }

    async fn nearest(
        &self,
        model: &str,
        language: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>> {
        let stored = self.vectors.read().await;
        if let Some(dimension) = model_dimension(&stored, model) {
            check_dimension(dimension, query.len())?;
        }

        let neighbors: Vec<Neighbor> = stored
            .values()
            .filter(|vector| vector.model == model && vector.language == language)
            .map(|vector| Neighbor {
                record_id: vector.record_id,
                distance: 1.0 - cosine_similarity(query, &vector.values),
            })
            .collect();

        debug!(
            "Exact nearest-neighbor scan over {} vectors for {model}/{language}",
            neighbors.len()
        );
        Ok(closest(neighbors, k))
    }

    async fn vectors(&self, model: &str, language: &str) -> Result<Vec<EmbeddingVector>> {
        let stored = self.vectors.read().await;
        let mut found: Vec<EmbeddingVector> = stored
            .values()
            .filter(|vector| vector.model == model && vector.language == language)
            .cloned()
            .collect();
        found.sort_by_key(|vector| vector.record_id);
        Ok(found)
    }

    async fn count(&self, model: Option<&str>, language: Option<&str>) -> Result<usize> {
        let stored = self.vectors.read().await;
        Ok(stored
            .values()
            .filter(|vector| model.is_none_or(|m| vector.model == m))
            .filter(|vector| language.is_none_or(|l| vector.language == l))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VectorStoreError;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn vector(record_id: i64, model: &str, values: Vec<f32>) -> EmbeddingVector {
        EmbeddingVector::new(record_id, model, "en", values)
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let store = MemoryVectorStore::new();
        store.upsert(vec![vector(1, "m", vec![1.0, 0.0])]).await.unwrap();
        store.upsert(vec![vector(1, "m", vec![0.0, 1.0])]).await.unwrap();

        assert_eq!(store.count(Some("m"), Some("en")).await.unwrap(), 1);
        let stored = store.vectors("m", "en").await.unwrap();
        assert_eq!(stored[0].values, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_models_coexist() {
        let store = MemoryVectorStore::new();
        store
            .upsert(vec![vector(1, "old", vec![1.0, 0.0]), vector(1, "new", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.count(None, None).await.unwrap(), 2);
        assert_eq!(store.count(Some("new"), None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_on_upsert() {
        let store = MemoryVectorStore::new();
        store.upsert(vec![vector(1, "m", vec![1.0, 0.0])]).await.unwrap();
        let err = store
            .upsert(vec![vector(2, "m", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));

        let err = store
            .upsert(vec![vector(3, "fresh", vec![1.0]), vector(4, "fresh", vec![1.0, 2.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::DimensionMismatch { .. }));
        assert_eq!(store.count(Some("fresh"), None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nearest_orders_by_distance() {
        let store = MemoryVectorStore::new();
        store
            .upsert(vec![
                vector(1, "m", vec![1.0, 0.0]),
                vector(2, "m", vec![0.7, 0.7]),
                vector(3, "m", vec![0.0, 1.0]),
                EmbeddingVector::new(4, "m", "ar", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let neighbors = store.nearest("m", "en", &[1.0, 0.1], 2).await.unwrap();
        let ids: Vec<i64> = neighbors.iter().map(|n| n.record_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(neighbors[0].distance <= neighbors[1].distance);
    }

    #[tokio::test]
    async fn test_nearest_rejects_wrong_query_dimension() {
        let store = MemoryVectorStore::new();
        store.upsert(vec![vector(1, "m", vec![1.0, 0.0])]).await.unwrap();
        let result = store.nearest("m", "en", &[1.0, 0.0, 0.0], 5).await;
        assert!(matches!(
            result,
            Err(VectorStoreError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_nearest_without_vectors_is_empty() {
        let store = MemoryVectorStore::new();
        assert!(store.nearest("m", "en", &[1.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vectors").join("store.json");

        let store = MemoryVectorStore::open(&path).await.unwrap();
        store.upsert(vec![vector(1, "m", vec![1.0, 0.0])]).await.unwrap();
        drop(store);

        let reopened = MemoryVectorStore::open(&path).await.unwrap();
        assert_eq!(reopened.count(None, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_store_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("vectors");
        let path = dir.join("store.json");

        let store = MemoryVectorStore::open(&path).await.unwrap();
        store.upsert(vec![vector(1, "m", vec![1.0, 0.0])]).await.unwrap();

        // A file where the directory was makes every write fail.
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, b"not a directory").unwrap();

        let result = store
            .upsert(vec![
                vector(1, "m", vec![0.0, 1.0]),
                vector(2, "m", vec![1.0, 1.0]),
                vector(1, "m", vec![0.5, 0.5]),
            ])
            .await;
        assert!(matches!(result, Err(VectorStoreError::Io(_))));

        assert_eq!(store.count(None, None).await.unwrap(), 1);
        let stored = store.vectors("m", "en").await.unwrap();
        assert_eq!(stored[0].values, vec![1.0, 0.0]);
        let neighbors = store.nearest("m", "en", &[1.0, 1.0], 5).await.unwrap();
        assert_eq!(neighbors.len(), 1);
    }
}
