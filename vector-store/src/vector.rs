use crate::error::{Result, check_dimension};
use serde::{Deserialize, Serialize};

/// Natural key of a stored vector. Vectors of different models never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmbeddingKey {
    pub record_id: i64,
    pub model: String,
    pub language: String,
}

/// An embedding of one record's text in one language by one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub record_id: i64,

    /// Identifier of the model that produced the vector
    pub model: String,

    /// Language of the embedded text
    pub language: String,

    /// Recorded length, checked against `values` and the model's dimension
    pub dimension: usize,

    pub values: Vec<f32>,
}

impl EmbeddingVector {
    pub fn new(
        record_id: i64,
        model: impl Into<String>,
        language: impl Into<String>,
        values: Vec<f32>,
    ) -> Self {
        Self {
            record_id,
            model: model.into(),
            language: language.into(),
            dimension: values.len(),
            values,
        }
    }

    pub fn key(&self) -> EmbeddingKey {
        EmbeddingKey {
            record_id: self.record_id,
            model: self.model.clone(),
            language: self.language.clone(),
        }
    }

    /// The recorded dimension must match the actual length.
    pub fn validate(&self) -> Result<()> {
        check_dimension(self.dimension, self.values.len())
    }
}

/// A nearest-neighbor hit; smaller distance is more similar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub record_id: i64,
    pub distance: f32,
}

impl Neighbor {
    /// Similarity in `[0, 1]` for cosine distances.
    pub fn similarity(&self) -> f32 {
        (1.0 - self.distance).max(0.0)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// Sort ascending by distance, ties by record id, keep `k`.
pub(crate) fn closest(mut neighbors: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    neighbors.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.record_id.cmp(&b.record_id))
    });
    neighbors.truncate(k);
    neighbors
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_recorded_dimension_is_checked() {
        let mut vector = EmbeddingVector::new(1, "m", "en", vec![1.0, 0.0]);
        assert!(vector.validate().is_ok());
        vector.dimension = 3;
        assert!(vector.validate().is_err());
    }

    #[test]
    fn test_neighbor_similarity_is_clamped() {
        let far = Neighbor {
            record_id: 1,
            distance: 1.7,
        };
        assert_eq!(far.similarity(), 0.0);
    }

    #[test]
    fn test_closest_orders_and_truncates() {
        let neighbors = vec![
            Neighbor { record_id: 3, distance: 0.5 },
            Neighbor { record_id: 1, distance: 0.2 },
            Neighbor { record_id: 2, distance: 0.2 },
        ];
        let ids: Vec<i64> = closest(neighbors, 2).iter().map(|n| n.record_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
