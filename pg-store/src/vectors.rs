use crate::error::vector_error;
use crate::schema::nearest_sql;
use crate::store::{PgStore, sql_limit};
use async_trait::async_trait;
use hidaya_vector_store::{EmbeddingVector, Neighbor, Result, VectorStore, VectorStoreError};
use log::debug;
use pgvector::Vector;
use std::collections::HashMap;

impl PgStore {
    /// Dimension of the vectors already stored for `model`, if any.
    async fn model_dimension(&self, model: &str) -> Result<Option<usize>> {
        let row = self
            .client
            .query_opt(
                "SELECT dimension FROM embeddings WHERE model = $1 LIMIT 1",
                &[&model],
            )
            .await
            .map_err(vector_error)?;
        Ok(row.map(|row| usize::try_from(row.get::<_, i32>("dimension")).unwrap_or_default()))
    }
}

fn mismatch(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(VectorStoreError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[async_trait]
impl VectorStore for PgStore {
    async fn upsert(&self, vectors: Vec<EmbeddingVector>) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        // Check everything before the first write.
        let mut dimensions: HashMap<&str, usize> = HashMap::new();
        for vector in &vectors {
            vector.validate()?;
            match dimensions.get(vector.model.as_str()) {
                Some(&expected) => mismatch(expected, vector.dimension)?,
                None => {
                    if let Some(expected) = self.model_dimension(&vector.model).await? {
                        mismatch(expected, vector.dimension)?;
                    }
                    dimensions.insert(&vector.model, vector.dimension);
                }
            }
        }

        let statement = self
            .client
            .prepare(
                "INSERT INTO embeddings (record_id, model, language, dimension, embedding) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (record_id, model, language) DO UPDATE SET \
                 dimension = EXCLUDED.dimension, embedding = EXCLUDED.embedding",
            )
            .await
            .map_err(vector_error)?;

        let mut written = 0;
        for vector in vectors {
            let dimension = i32::try_from(vector.dimension).map_err(|_| {
                VectorStoreError::InvalidIndex(format!("dimension {} too large", vector.dimension))
            })?;
            let embedding = Vector::from(vector.values);
            self.client
                .execute(
                    &statement,
                    &[
                        &vector.record_id,
                        &vector.model,
                        &vector.language,
                        &dimension,
                        &embedding,
                    ],
                )
                .await
                .map_err(vector_error)?;
            written += 1;
        }
        debug!("Upserted {written} embeddings");
        Ok(written)
    }

    async fn nearest(
        &self,
        model: &str,
        language: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>> {
        let Some(dimension) = self.model_dimension(model).await? else {
            return Ok(Vec::new());
        };
        mismatch(dimension, query.len())?;

        let embedding = Vector::from(query.to_vec());
        let rows = self
            .client
            .query(
                &nearest_sql(dimension),
                &[&embedding, &model, &language, &sql_limit(k)],
            )
            .await
            .map_err(vector_error)?;
        Ok(rows
            .iter()
            .map(|row| {
                let distance: f64 = row.get("distance");
                Neighbor {
                    record_id: row.get("record_id"),
                    distance: distance as f32,
                }
            })
            .collect())
    }

    async fn vectors(&self, model: &str, language: &str) -> Result<Vec<EmbeddingVector>> {
        let rows = self
            .client
            .query(
                "SELECT record_id, embedding FROM embeddings \
                 WHERE model = $1 AND language = $2 ORDER BY record_id",
                &[&model, &language],
            )
            .await
            .map_err(vector_error)?;
        Ok(rows
            .iter()
            .map(|row| {
                let embedding: Vector = row.get("embedding");
                EmbeddingVector::new(row.get("record_id"), model, language, embedding.to_vec())
            })
            .collect())
    }

    async fn count(&self, model: Option<&str>, language: Option<&str>) -> Result<usize> {
        let row = self
            .client
            .query_one(
                "SELECT count(*) AS n FROM embeddings \
                 WHERE ($1::text IS NULL OR model = $1) AND ($2::text IS NULL OR language = $2)",
                &[&model, &language],
            )
            .await
            .map_err(vector_error)?;
        Ok(usize::try_from(row.get::<_, i64>("n")).unwrap_or_default())
    }
}
