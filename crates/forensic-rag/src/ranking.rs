// Ranking engine - lexical + vector + recency into one deterministic top-k
//
// composite = lexical + similarity * vector_weight + recency bonus
// Ties break on input position, so sequential and parallel runs agree.

use crate::config::{EngineConfig, RankingWeights};
use crate::error::{ForensicError, Result};
use crate::lexical::LexicalScorer;
use crate::vector::{validate_dimension, validate_finite, EmbeddingProvider, VectorIndex};
use chrono::{DateTime, Utc};
use forensic_core::LogChunk;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-component score of one chunk
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub lexical: u32,
    // raw cosine similarity, None when no embedding pair was compared
    pub similarity: Option<f32>,
    // similarity scaled by vector_weight
    pub vector: f64,
    pub recency: f64,
}

impl ScoreBreakdown {
    pub fn composite(&self) -> f64 {
        self.lexical as f64 + self.vector + self.recency
    }
}

#[derive(Debug, Clone)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a LogChunk,
    // index in the caller's chunk slice
    pub position: usize,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// A chunk left out of the ranking because its embedding could not be compared
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedChunk {
    pub id: String,
    pub position: usize,
    pub error: ForensicError,
}

/// Ranked evidence, best first, at most top_k long
#[derive(Debug, Clone, Default)]
pub struct RankedEvidenceSet<'a> {
    pub entries: Vec<ScoredChunk<'a>>,
    pub excluded: Vec<ExcludedChunk>,
}

impl<'a> RankedEvidenceSet<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredChunk<'a>> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.chunk.id.as_str()).collect()
    }
}

/// Validate a caller-supplied top_k at the boundary
pub fn validate_top_k(raw: i64) -> Result<usize> {
    usize::try_from(raw).map_err(|_| ForensicError::InvalidTopK(raw))
}

// score descending, then input order
fn by_rank(a: &ScoredChunk<'_>, b: &ScoredChunk<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.position.cmp(&b.position))
}

pub struct RankingEngine {
    weights: RankingWeights,
    lexical: LexicalScorer,
    index: VectorIndex,
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl RankingEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            weights: config.ranking.clone(),
            lexical: LexicalScorer::new(&config.ranking),
            index: VectorIndex::new(config.dimension),
            provider: None,
        }
    }

    /// Attach the embedding collaborator used for queries and for chunks
    /// that arrive without a precomputed vector.
    pub fn with_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        validate_dimension(self.index.dimension(), provider.dimensions())?;
        self.provider = Some(provider);
        Ok(self)
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Rank `chunks` for `query`, embedding the query through the provider if one is set.
    pub fn rank<'a>(
        &self,
        query: &str,
        chunks: &'a [LogChunk],
        top_k: usize,
    ) -> Result<RankedEvidenceSet<'a>> {
        let query_embedding = match &self.provider {
            Some(provider) if !query.trim().is_empty() && top_k > 0 && !chunks.is_empty() => {
                Some(provider.embed(query)?)
            }
            _ => None,
        };
        self.rank_with_embedding(query, query_embedding.as_deref(), chunks, top_k)
    }

    /// Rank with a query embedding the caller already has (or none: lexical + recency only).
    /// Chunks the query can't be compared against score 0 on the vector component.
    pub fn rank_with_embedding<'a>(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        chunks: &'a [LogChunk],
        top_k: usize,
    ) -> Result<RankedEvidenceSet<'a>> {
        info!(chunks = chunks.len(), top_k, vector = query_embedding.is_some(), "Ranking request");

        if top_k == 0 || chunks.is_empty() {
            return Ok(RankedEvidenceSet::default());
        }
        if let Some(embedding) = query_embedding {
            validate_dimension(self.index.dimension(), embedding.len())?;
            validate_finite(embedding)?;
        }

        let newest = chunks.iter().filter_map(|c| c.timestamp).max();
        let parallel = chunks.len() >= self.weights.parallel_threshold;

        let score = |(position, chunk): (usize, &'a LogChunk)| {
            self.score_chunk(query, query_embedding, newest, position, chunk)
                .map_err(|error| ExcludedChunk {
                    id: chunk.id.clone(),
                    position,
                    error,
                })
        };

        let outcomes: Vec<std::result::Result<ScoredChunk<'a>, ExcludedChunk>> = if parallel {
            chunks.par_iter().enumerate().map(score).collect()
        } else {
            chunks.iter().enumerate().map(score).collect()
        };

        let mut entries = Vec::with_capacity(outcomes.len());
        let mut excluded = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(scored) => entries.push(scored),
                Err(skip) => {
                    warn!(chunk_id = %skip.id, error = %skip.error, "Chunk excluded from ranking");
                    excluded.push(skip);
                }
            }
        }

        if parallel {
            entries.par_sort_by(by_rank);
        } else {
            entries.sort_by(by_rank);
        }
        entries.truncate(top_k);

        debug!(
            selected = entries.len(),
            excluded = excluded.len(),
            parallel,
            "Ranking complete"
        );

        Ok(RankedEvidenceSet { entries, excluded })
    }

    /// Score one chunk.
    ///
    /// With a query embedding, a chunk that has no vector of its own and no
    /// provider to compute one gets a vector component of 0 (similarity `None`).
    /// It therefore ranks above chunks whose cosine similarity is negative.
    fn score_chunk<'a>(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        newest: Option<DateTime<Utc>>,
        position: usize,
        chunk: &'a LogChunk,
    ) -> Result<ScoredChunk<'a>> {
        let lexical = self.lexical.score(query, &chunk.text);

        let similarity = match (query_embedding, &chunk.embedding) {
            (None, _) => None,
            (Some(query), Some(embedding)) => Some(self.index.similarity(query, embedding)?),
            (Some(query), None) => match self.embed_chunk(chunk)? {
                Some(embedding) => Some(self.index.similarity(query, &embedding)?),
                None => None,
            },
        };

        let breakdown = ScoreBreakdown {
            lexical,
            similarity,
            vector: similarity.map_or(0.0, |s| s as f64 * self.weights.vector_weight),
            recency: self.recency_bonus(newest, chunk.timestamp),
        };

        Ok(ScoredChunk {
            chunk,
            position,
            score: breakdown.composite(),
            breakdown,
        })
    }

    // cached vector, else ask the provider once and cache it under (id, text)
    fn embed_chunk(&self, chunk: &LogChunk) -> Result<Option<Arc<[f32]>>> {
        if let Some(cached) = self.index.cached(&chunk.id, &chunk.text) {
            return Ok(Some(cached));
        }
        match &self.provider {
            Some(provider) => {
                let embedding = provider.embed(&chunk.text)?;
                Ok(Some(self.index.insert(&chunk.id, &chunk.text, embedding)?))
            }
            None => Ok(None),
        }
    }

    /// Halves every half-life, measured back from the newest timestamp in the request.
    /// Untimed chunks get nothing.
    fn recency_bonus(&self, newest: Option<DateTime<Utc>>, timestamp: Option<DateTime<Utc>>) -> f64 {
        match (newest, timestamp) {
            (Some(newest), Some(timestamp)) => {
                let age_secs = (newest - timestamp).num_milliseconds().max(0) as f64 / 1000.0;
                self.weights.recency_weight
                    * 0.5_f64.powf(age_secs / self.weights.recency_half_life_secs)
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn engine() -> RankingEngine {
        RankingEngine::new(&EngineConfig::default())
    }

    #[test]
    fn test_connection_refused_example() {
        let chunks = vec![
            LogChunk::new("a", "FATAL: connection refused at db").with_timestamp(at(2)),
            LogChunk::new("b", "INFO: retry scheduled").with_timestamp(at(3)),
            LogChunk::new("c", "ERROR: connection refused").with_timestamp(at(1)),
        ];

        let ranked = engine().rank("connection refused", &chunks, 2).unwrap();

        assert_eq!(ranked.ids(), vec!["a", "c"]);
        assert_eq!(ranked.entries[0].breakdown.lexical, 300);
        assert_eq!(ranked.entries[1].breakdown.lexical, 250);
        assert!(ranked.excluded.is_empty());
    }

    #[test]
    fn test_empty_input_and_zero_top_k() {
        let engine = engine();
        assert!(engine.rank("anything", &[], 5).unwrap().is_empty());

        let chunks = vec![LogChunk::new("a", "FATAL")];
        assert!(engine.rank("anything", &chunks, 0).unwrap().is_empty());
    }

    #[test]
    fn test_top_k_larger_than_input() {
        let chunks = vec![LogChunk::new("a", "x"), LogChunk::new("b", "y")];
        let ranked = engine().rank("z", &chunks, 10).unwrap();
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let chunks: Vec<LogChunk> = (0..6)
            .map(|i| LogChunk::new(format!("c{i}"), "ERROR: same text"))
            .collect();
        let ranked = engine().rank("unrelated", &chunks, 6).unwrap();
        assert_eq!(ranked.ids(), vec!["c0", "c1", "c2", "c3", "c4", "c5"]);
    }

    #[test]
    fn test_recency_bonus_is_monotonic() {
        let engine = engine();
        let newest = Some(at(10_000));
        let fresh = engine.recency_bonus(newest, Some(at(10_000)));
        let hour_old = engine.recency_bonus(newest, Some(at(10_000 - 3600)));
        let older = engine.recency_bonus(newest, Some(at(0)));

        assert!((fresh - 25.0).abs() < 1e-9);
        assert!((hour_old - 12.5).abs() < 1e-9);
        assert!(older < hour_old);
        assert_eq!(engine.recency_bonus(newest, None), 0.0);
    }

    #[test]
    fn test_vector_component() {
        let mut config = EngineConfig::default();
        config.dimension = 2;
        let engine = RankingEngine::new(&config);

        let chunks = vec![
            LogChunk::new("far", "disk").with_embedding(vec![0.0, 1.0]),
            LogChunk::new("near", "disk").with_embedding(vec![1.0, 0.0]),
            LogChunk::new("none", "disk"),
        ];
        let ranked = engine
            .rank_with_embedding("disk", Some(&[1.0, 0.0][..]), &chunks, 3)
            .unwrap();

        assert_eq!(ranked.ids(), vec!["near", "far", "none"]);
        assert_eq!(ranked.entries[0].breakdown.similarity, Some(1.0));
        assert!((ranked.entries[0].breakdown.vector - 100.0).abs() < 1e-6);
        assert_eq!(ranked.entries[2].breakdown.similarity, None);
    }

    #[test]
    fn test_unembedded_chunk_outranks_opposite_vector() {
        let mut config = EngineConfig::default();
        config.dimension = 2;
        let engine = RankingEngine::new(&config);

        let chunks = vec![
            LogChunk::new("opposite", "disk").with_embedding(vec![-1.0, 0.0]),
            LogChunk::new("none", "disk"),
        ];
        let ranked = engine
            .rank_with_embedding("disk", Some(&[1.0, 0.0][..]), &chunks, 2)
            .unwrap();

        assert_eq!(ranked.ids(), vec!["none", "opposite"]);
        assert_eq!(ranked.entries[0].breakdown.vector, 0.0);
        assert!(ranked.entries[1].breakdown.vector < 0.0);
    }

    #[test]
    fn test_mismatched_chunk_is_excluded() {
        let engine = engine();
        let query = vec![0.1_f32; 768];
        let chunks = vec![
            LogChunk::new("ok", "ERROR: a").with_embedding(vec![0.1; 768]),
            LogChunk::new("short", "FATAL: b").with_embedding(vec![0.1; 512]),
            LogChunk::new("plain", "c"),
        ];

        let ranked = engine.rank_with_embedding("q", Some(query.as_slice()), &chunks, 10).unwrap();

        assert_eq!(ranked.ids(), vec!["ok", "plain"]);
        assert_eq!(ranked.excluded.len(), 1);
        assert_eq!(ranked.excluded[0].id, "short");
        assert_eq!(
            ranked.excluded[0].error,
            ForensicError::DimensionMismatch { expected: 768, actual: 512 }
        );
    }

    #[test]
    fn test_bad_query_embedding_is_an_error() {
        let chunks = vec![LogChunk::new("a", "x")];
        let result = engine().rank_with_embedding("q", Some(&[1.0; 3][..]), &chunks, 1);
        assert!(matches!(result, Err(ForensicError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_validate_top_k() {
        assert_eq!(validate_top_k(3), Ok(3));
        assert_eq!(validate_top_k(0), Ok(0));
        assert_eq!(validate_top_k(-1), Err(ForensicError::InvalidTopK(-1)));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let chunks = vec![
            LogChunk::new("a", "INFO").with_timestamp(at(1)),
            LogChunk::new("b", "FATAL").with_timestamp(at(2)),
        ];
        let before = chunks.clone();
        let _ = engine().rank("q", &chunks, 2).unwrap();
        assert_eq!(chunks, before);
    }
}
