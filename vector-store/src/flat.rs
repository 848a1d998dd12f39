use crate::error::{Result, VectorStoreError, check_dimension};
use hidaya_embeddings::normalize;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

const FLAT_FORMAT: &str = "flat-ip";

/// A search hit inside a standalone index; higher score is more similar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub score: f32,
    pub position: usize,
}

/// Positional nearest-neighbor search over normalized vectors.
pub trait AnnIndex: Send + Sync {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best `k` positions by inner product, descending.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>>;
}

/// Exhaustive inner-product index.
///
/// Vectors are normalized on insertion, so inner product equals cosine
/// similarity. Positions are assigned in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct PersistedFlat {
    format: String,
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Append vectors. Nothing is added if any of them has the wrong dimension.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            check_dimension(self.dimension, vector.len())?;
        }
        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            let start = self.data.len();
            self.data.extend_from_slice(vector);
            normalize(&mut self.data[start..]);
        }
        Ok(())
    }

    /// Stored (normalized) vector at `position`
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension.max(1))
    }

    /// Scores of `positions` against an already normalized query.
    pub(crate) fn score_positions(
        &self,
        query: &[f32],
        positions: impl IntoIterator<Item = usize>,
        k: usize,
    ) -> Vec<Hit> {
        let mut hits: Vec<Hit> = positions
            .into_iter()
            .filter_map(|position| {
                self.vector(position).map(|vector| Hit {
                    score: dot(query, vector),
                    position,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.position.cmp(&b.position)));
        hits.truncate(k);
        hits
    }

    /// Persist as an opaque JSON blob.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedFlat {
            format: FLAT_FORMAT.to_string(),
            dimension: self.dimension,
            data: self.data.clone(),
        };
        tokio::fs::write(path, serde_json::to_vec(&persisted)?).await?;
        info!(
            "Saved flat index ({} vectors, dimension {}) to {}",
            self.len(),
            self.dimension,
            path.display()
        );
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read(path).await?;
        let persisted: PersistedFlat = serde_json::from_slice(&content)?;
        if persisted.format != FLAT_FORMAT {
            return Err(VectorStoreError::InvalidIndex(format!(
                "unexpected index format `{}`",
                persisted.format
            )));
        }
        let index = Self {
            dimension: persisted.dimension,
            data: persisted.data,
        };
        index.validate()?;
        Ok(index)
    }

    /// Check the layout of an index read from outside.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 || self.data.len() % self.dimension != 0 {
            return Err(VectorStoreError::InvalidIndex(format!(
                "{} values do not divide into vectors of dimension {}",
                self.data.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    /// Load and require a specific dimension.
    pub async fn load_expecting(path: &Path, dimension: usize) -> Result<Self> {
        let index = Self::load(path).await?;
        check_dimension(dimension, index.dimension)?;
        Ok(index)
    }
}

impl AnnIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        check_dimension(self.dimension, query.len())?;
        let mut query = query.to_vec();
        normalize(&mut query);
        Ok(self.score_positions(&query, 0..self.len(), k))
    }
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
