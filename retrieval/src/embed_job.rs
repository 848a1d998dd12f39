use crate::context::SearchContext;
use crate::error::{Result, RetrievalError};
use hidaya_corpus::RecordId;
use hidaya_vector_store::EmbeddingVector;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Tally of one `embed_and_store` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmbedReport {
    pub success_count: usize,
    pub error_count: usize,
}

impl EmbedReport {
    pub fn total(&self) -> usize {
        self.success_count + self.error_count
    }
}

/// Batch job that embeds record texts and upserts the vectors.
///
/// Vectors are keyed by (record, model, language), so re-running the job
/// replaces rows instead of adding them. Per-item failures are counted and the
/// job moves on; a storage failure or dimension mismatch aborts it.
pub struct EmbedJob {
    ctx: Arc<SearchContext>,
}

impl EmbedJob {
    pub fn new(ctx: Arc<SearchContext>) -> Self {
        Self { ctx }
    }

    /// Embed `record_ids` (all records when `None`) in `language`.
    pub async fn embed_and_store(
        &self,
        record_ids: Option<&[RecordId]>,
        language: &str,
    ) -> Result<EmbedReport> {
        let language = language.trim().to_ascii_lowercase();
        if language.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "language must not be empty".to_string(),
            ));
        }

        let ids = match record_ids {
            Some(ids) => ids.to_vec(),
            None => self.ctx.store().record_ids().await?,
        };

        let Some(embedder) = self.ctx.embedder() else {
            warn!(
                "No embedding backend active; {} records in {language} not embedded",
                ids.len()
            );
            return Ok(EmbedReport {
                success_count: 0,
                error_count: ids.len(),
            });
        };

        let start = Instant::now();
        let model = embedder.identifier().to_string();
        let batch_size = self.ctx.config().batch_size;
        let mut report = EmbedReport::default();

        info!(
            "Embedding {} records in {language} with {model} (batches of {batch_size})",
            ids.len()
        );

        for (batch_number, batch) in ids.chunks(batch_size).enumerate() {
            let texts = self.texts(batch, &language).await?;

            let (present, texts): (Vec<RecordId>, Vec<String>) = batch
                .iter()
                .filter_map(|id| texts.get(id).map(|text| (*id, text.clone())))
                .unzip();
            let missing = batch.len() - present.len();
            if missing > 0 {
                warn!("{missing} records in batch {batch_number} have no {language} text");
            }

            let embeddings = embedder.embed_many(&texts).await;
            let mut failed = 0;
            let vectors: Vec<EmbeddingVector> = present
                .iter()
                .zip(embeddings)
                .filter_map(|(id, embedding)| match embedding {
                    Some(values) => Some(EmbeddingVector::new(*id, &model, &language, values)),
                    None => {
                        failed += 1;
                        None
                    }
                })
                .collect();
            if failed > 0 {
                warn!("{failed} embeddings failed in batch {batch_number}");
            }

            let written = self.ctx.vectors().upsert(vectors).await?;
            report.success_count += written;
            report.error_count += missing + failed;
            debug!(
                "Batch {batch_number}: {written} stored, {} failed",
                missing + failed
            );
        }

        if let Some(registry) = self.ctx.indexes() {
            registry.invalidate(&model, &language);
        }

        info!(
            "Embedded {} records in {language} ({} errors) in {:?}",
            report.success_count,
            report.error_count,
            start.elapsed()
        );
        Ok(report)
    }

    /// Text to embed per record: the original text for the corpus' own
    /// language, otherwise the first translation by translation id.
    async fn texts(&self, ids: &[RecordId], language: &str) -> Result<HashMap<RecordId, String>> {
        let mut texts = HashMap::with_capacity(ids.len());
        if self.ctx.is_original_language(language) {
            for record in self.ctx.store().records(ids).await? {
                texts.insert(record.id, record.text_original);
            }
            return Ok(texts);
        }

        let translator = self.ctx.config().embedding_translator.as_deref();
        let translations = self
            .ctx
            .store()
            .translations(ids, language, translator)
            .await?;
        for translation in translations {
            if translation.text.trim().is_empty() {
                continue;
            }
            texts
                .entry(translation.record_id)
                .or_insert(translation.text);
        }
        Ok(texts)
    }
}
