use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;
use log::{debug, warn};
use std::future::Future;

/// Uniform contract every embedding provider honors.
///
/// `identifier` and `dimension` are fixed at construction. Returned vectors are
/// unit-normalized, so inner product and cosine similarity agree.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name recorded next to stored vectors
    fn identifier(&self) -> &str;

    /// Length of every vector this backend produces
    fn dimension(&self) -> usize;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed texts in order; `None` marks an item that failed on its own.
    ///
    /// The output always has exactly `texts.len()` entries.
    async fn embed_many(&self, texts: &[String]) -> Vec<Option<Vec<f32>>>;
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

pub(crate) fn check_input(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(EmbeddingError::InvalidInput(
            "cannot embed empty text".to_string(),
        ));
    }
    Ok(())
}

/// Validate the length of a freshly produced vector and normalize it.
pub(crate) fn finish(mut vector: Vec<f32>, dimension: usize) -> Result<Vec<f32>> {
    if vector.len() != dimension {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    normalize(&mut vector);
    Ok(vector)
}

/// Shared batching policy for providers.
///
/// Texts are sent in chunks of `batch_size`. When a chunk fails as a whole, or
/// comes back with the wrong number of vectors, each of its texts is retried on
/// its own so a single bad input only nulls its own slot.
pub(crate) async fn embed_in_batches<F, Fut>(
    texts: &[String],
    batch_size: usize,
    dimension: usize,
    mut call: F,
) -> Vec<Option<Vec<f32>>>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<Vec<f32>>>>,
{
    let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];

    let positions: Vec<usize> = texts
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(position, _)| position)
        .collect();
    if positions.len() < texts.len() {
        warn!(
            "Skipping {} empty texts in embedding batch",
            texts.len() - positions.len()
        );
    }

    for chunk in positions.chunks(batch_size.max(1)) {
        let batch: Vec<String> = chunk.iter().map(|&i| texts[i].clone()).collect();
        match call(batch).await {
            Ok(vectors) if vectors.len() == chunk.len() => {
                for (&position, vector) in chunk.iter().zip(vectors) {
                    results[position] = keep(position, finish(vector, dimension));
                }
                continue;
            }
            Ok(vectors) => warn!(
                "Backend returned {} vectors for {} texts; retrying items individually",
                vectors.len(),
                chunk.len()
            ),
            Err(err) => warn!("Embedding batch of {} failed: {err}", chunk.len()),
        }

        if chunk.len() == 1 {
            continue;
        }

        for &position in chunk {
            let single = call(vec![texts[position].clone()]).await.and_then(|mut vectors| {
                match (vectors.pop(), vectors.is_empty()) {
                    (Some(vector), true) => finish(vector, dimension),
                    _ => Err(EmbeddingError::EmbeddingGeneration(
                        "expected exactly one vector".to_string(),
                    )),
                }
            });
            results[position] = keep(position, single);
        }
    }

    debug!(
        "Embedded {}/{} texts",
        results.iter().filter(|r| r.is_some()).count(),
        texts.len()
    );
    results
}

fn keep(position: usize, outcome: Result<Vec<f32>>) -> Option<Vec<f32>> {
    match outcome {
        Ok(vector) => Some(vector),
        Err(err) => {
            warn!("Embedding failed for item {position}: {err}");
            None
        }
    }
}
