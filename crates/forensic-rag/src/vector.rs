// Vector index - dimension-checked cosine similarity plus an append-only embedding cache

use crate::error::{ForensicError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

/// External embedding model (`text -> Embedding`).
///
/// The index never produces vectors itself; whatever sits behind this trait
/// (fastembed, a remote service, a test double) must return `dimensions()`
/// values for every call.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize;

    fn name(&self) -> &str;
}

/// Returns `Ok(())` if dimensions match, or `Err(DimensionMismatch)` otherwise.
pub fn validate_dimension(expected: usize, actual: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(ForensicError::DimensionMismatch { expected, actual })
    }
}

/// Every component must be a finite number
pub fn validate_finite(embedding: &[f32]) -> Result<()> {
    match embedding.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(ForensicError::NonFiniteEmbedding(index)),
        None => Ok(()),
    }
}

/// Cosine similarity in [-1, 1]. Zero-magnitude vectors (and vectors holding
/// NaN/inf) score 0.0. Callers validate dimensions first; this only zips.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (mag_a * mag_b);
    if !similarity.is_finite() {
        return 0.0;
    }
    similarity.clamp(-1.0, 1.0)
}

/// Fixed-dimension vector index.
///
/// Holds embeddings computed on demand for chunks that arrived without one.
/// The cache is append-only and keyed by chunk id plus a hash of the chunk text,
/// so two inputs that reuse an id (`line-1` from different files) never share a
/// vector. The first writer for a key wins and later inserts return the stored
/// vector.
pub struct VectorIndex {
    dimension: usize,
    cache: DashMap<(String, u64), Arc<[f32]>>,
}

fn cache_key(chunk_id: &str, text: &str) -> (String, u64) {
    (chunk_id.to_string(), xxh3_64(text.as_bytes()))
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            cache: DashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Similarity between a query embedding and a chunk embedding.
    ///
    /// # Errors
    /// `DimensionMismatch` if either side is not exactly `dimension` long,
    /// `NonFiniteEmbedding` if either side holds NaN or infinity.
    pub fn similarity(&self, query: &[f32], chunk: &[f32]) -> Result<f32> {
        validate_dimension(self.dimension, query.len())?;
        validate_dimension(self.dimension, chunk.len())?;
        validate_finite(query)?;
        validate_finite(chunk)?;
        Ok(cosine_similarity(query, chunk))
    }

    pub fn cached(&self, chunk_id: &str, text: &str) -> Option<Arc<[f32]>> {
        self.cache
            .get(&cache_key(chunk_id, text))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Store an embedding for (`chunk_id`, `text`) unless one is already there.
    /// Returns the vector that ends up cached.
    pub fn insert(&self, chunk_id: &str, text: &str, embedding: Vec<f32>) -> Result<Arc<[f32]>> {
        validate_dimension(self.dimension, embedding.len())?;
        validate_finite(&embedding)?;
        let entry = self
            .cache
            .entry(cache_key(chunk_id, text))
            .or_insert_with(|| Arc::from(embedding));
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
