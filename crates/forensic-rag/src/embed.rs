// fastembed-backed embedding provider (local, no API key needed)

use crate::error::{ForensicError, Result};
use crate::vector::EmbeddingProvider;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// BGE base v1.5 produces 768-d vectors
pub const BGE_BASE_DIMENSION: usize = 768;

pub struct FastEmbedProvider {
    // embed() needs &mut self
    model: Mutex<TextEmbedding>,
}

impl FastEmbedProvider {
    /// Load BGE base v1.5 (downloads the model on first use)
    pub fn bge_base() -> Result<Self> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::BGEBaseENV15))
            .map_err(|e| ForensicError::Embedding(e.to_string()))?;
        tracing::info!(model = "BGEBaseENV15", "Embedding model loaded");
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| ForensicError::Embedding("embedding model lock poisoned".to_string()))?;
        let embeddings = model
            .embed(vec![text.to_string()], None)
            .map_err(|e| ForensicError::Embedding(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ForensicError::Embedding("No embedding".to_string()))
    }

    fn dimensions(&self) -> usize {
        BGE_BASE_DIMENSION
    }

    fn name(&self) -> &str {
        "fastembed"
    }
}
