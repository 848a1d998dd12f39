use crate::error::{Result, VectorStoreError, check_dimension};
use crate::flat::{AnnIndex, FlatIndex, Hit, dot};
use hidaya_embeddings::normalize;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

const IVF_FORMAT: &str = "ivf-ip";
const TRAINING_ITERATIONS: usize = 10;

/// Inverted-file index: vectors are bucketed under k-means centroids and a
/// query only scans the `probes` closest buckets.
///
/// Training is deterministic (centroids are seeded from evenly spaced
/// vectors), so two builds over the same data return the same results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvfIndex {
    vectors: FlatIndex,
    centroids: Vec<Vec<f32>>,
    lists: Vec<Vec<usize>>,
    probes: usize,
}

#[derive(Serialize, Deserialize)]
struct PersistedIvf {
    format: String,
    index: IvfIndex,
}

impl IvfIndex {
    /// Train `lists` buckets over every vector of `vectors`.
    pub fn train(vectors: FlatIndex, lists: usize, probes: usize) -> Result<Self> {
        if lists == 0 || probes == 0 {
            return Err(VectorStoreError::InvalidIndex(
                "IVF lists and probes must be at least 1".to_string(),
            ));
        }

        let count = vectors.len();
        let lists = lists.min(count.max(1));
        let mut centroids: Vec<Vec<f32>> = (0..lists)
            .filter_map(|i| vectors.vector(i * count / lists).map(<[f32]>::to_vec))
            .collect();
        let mut assignment = vec![0usize; count];

        for iteration in 0..TRAINING_ITERATIONS {
            let mut changed = false;
            for (position, vector) in vectors.iter().enumerate() {
                let best = closest_centroid(&centroids, vector);
                if assignment[position] != best {
                    assignment[position] = best;
                    changed = true;
                }
            }

            let dimension = vectors.dimension();
            let mut sums = vec![vec![0.0f32; dimension]; centroids.len()];
            let mut sizes = vec![0usize; centroids.len()];
            for (position, vector) in vectors.iter().enumerate() {
                let bucket = assignment[position];
                sizes[bucket] += 1;
                for (sum, value) in sums[bucket].iter_mut().zip(vector) {
                    *sum += value;
                }
            }
            for ((centroid, mut sum), size) in centroids.iter_mut().zip(sums).zip(sizes) {
                // An empty bucket keeps its previous centroid.
                if size > 0 {
                    normalize(&mut sum);
                    *centroid = sum;
                }
            }

            if !changed && iteration > 0 {
                debug!("IVF training converged after {} iterations", iteration + 1);
                break;
            }
        }

        let mut buckets = vec![Vec::new(); centroids.len()];
        for (position, bucket) in assignment.into_iter().enumerate() {
            buckets[bucket].push(position);
        }

        info!(
            "Trained IVF index: {count} vectors in {} lists, {probes} probes",
            centroids.len()
        );
        Ok(Self {
            vectors,
            centroids,
            lists: buckets,
            probes,
        })
    }

    pub fn lists(&self) -> usize {
        self.centroids.len()
    }

    pub fn probes(&self) -> usize {
        self.probes
    }

    pub fn set_probes(&mut self, probes: usize) {
        self.probes = probes.max(1);
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedIvf {
            format: IVF_FORMAT.to_string(),
            index: self.clone(),
        };
        tokio::fs::write(path, serde_json::to_vec(&persisted)?).await?;
        info!("Saved IVF index to {}", path.display());
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read(path).await?;
        let persisted: PersistedIvf = serde_json::from_slice(&content)?;
        if persisted.format != IVF_FORMAT {
            return Err(VectorStoreError::InvalidIndex(format!(
                "unexpected index format `{}`",
                persisted.format
            )));
        }
        persisted.index.validate()?;
        Ok(persisted.index)
    }

    /// Check that every stored vector sits in exactly one list and every list
    /// has a centroid of the index dimension.
    pub fn validate(&self) -> Result<()> {
        self.vectors.validate()?;
        let dimension = self.vectors.dimension();
        if self.lists.len() != self.centroids.len() {
            return Err(VectorStoreError::InvalidIndex(format!(
                "{} IVF lists for {} centroids",
                self.lists.len(),
                self.centroids.len()
            )));
        }
        if let Some(centroid) = self.centroids.iter().find(|c| c.len() != dimension) {
            return Err(VectorStoreError::InvalidIndex(format!(
                "IVF centroid of dimension {} in an index of dimension {dimension}",
                centroid.len()
            )));
        }

        let count = self.vectors.len();
        let mut seen = vec![false; count];
        for &position in self.lists.iter().flatten() {
            match seen.get_mut(position) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(VectorStoreError::InvalidIndex(format!(
                        "IVF list entry {position} is out of range or repeated"
                    )));
                }
            }
        }
        if seen.iter().any(|assigned| !assigned) {
            return Err(VectorStoreError::InvalidIndex(
                "IVF lists do not cover the stored vectors".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn load_expecting(path: &Path, dimension: usize) -> Result<Self> {
        let index = Self::load(path).await?;
        check_dimension(dimension, index.dimension())?;
        Ok(index)
    }
}

fn closest_centroid(centroids: &[Vec<f32>], vector: &[f32]) -> usize {
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let score = dot(centroid, vector);
        if score > best_score {
            best = i;
            best_score = score;
        }
    }
    best
}

impl AnnIndex for IvfIndex {
    fn dimension(&self) -> usize {
        self.vectors.dimension()
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        check_dimension(self.dimension(), query.len())?;
        let mut query = query.to_vec();
        normalize(&mut query);

        let mut ranked: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, centroid)| (i, dot(centroid, &query)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let candidates = ranked
            .into_iter()
            .take(self.probes)
            .filter_map(|(bucket, _)| self.lists.get(bucket))
            .flat_map(|list| list.iter().copied());
        Ok(self.vectors.score_positions(&query, candidates, k))
    }
}
