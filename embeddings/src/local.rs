use crate::backend::{Embedder, check_input, embed_in_batches, finish};
use crate::config::{EmbeddingConfig, LocalModel};
use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use log::{debug, info};
use std::sync::Mutex;

impl LocalModel {
    fn to_fastembed_model(self) -> EmbeddingModel {
        match self {
            LocalModel::ParaphraseMultilingualMiniLmL12V2 => EmbeddingModel::ParaphraseMLMiniLML12V2,
            LocalModel::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
            LocalModel::MultilingualE5Small => EmbeddingModel::MultilingualE5Small,
            LocalModel::NomicEmbedTextV15 => EmbeddingModel::NomicEmbedTextV15,
        }
    }
}

/// In-process embedding backend running an ONNX model through fastembed.
///
/// Inference is synchronous CPU work performed on the calling task. Callers that
/// need cancellation should run it on a blocking thread and cancel there.
pub struct LocalBackend {
    model: Mutex<TextEmbedding>,
    kind: LocalModel,
    batch_size: usize,
}

impl LocalBackend {
    /// Load the configured local model, downloading it on first use.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let kind = config.local_model;
        info!(
            "Initializing local embedding backend with model {}, dimension {}",
            kind.identifier(),
            kind.dimension()
        );

        let init_options = InitOptions::new(kind.to_fastembed_model())
            .with_show_download_progress(config.show_download_progress);

        let model = TextEmbedding::try_new(init_options).map_err(|e| {
            EmbeddingError::ModelInitialization(format!("Failed to initialize model: {e}"))
        })?;

        info!("Local embedding backend initialized successfully");

        Ok(Self {
            model: Mutex::new(model),
            kind,
            batch_size: config.batch_size.max(1),
        })
    }

    pub fn model(&self) -> LocalModel {
        self.kind
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!("Generating local embeddings for {} texts", texts.len());
        let model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::Other("local model lock poisoned".to_string()))?;
        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingGeneration(e.to_string()))
    }
}

#[async_trait]
impl Embedder for LocalBackend {
    fn identifier(&self) -> &str {
        self.kind.identifier()
    }

    fn dimension(&self) -> usize {
        self.kind.dimension()
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        check_input(text)?;
        let vector = self
            .embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| EmbeddingError::EmbeddingGeneration("No embedding generated".into()))?;
        finish(vector, self.dimension())
    }

    async fn embed_many(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        embed_in_batches(texts, self.batch_size, self.dimension(), |batch| {
            std::future::ready(self.embed_batch(&batch))
        })
        .await
    }
}
