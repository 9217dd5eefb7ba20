// Forensic RAG core - evidence ranking, causal ordering, compliance enrichment, prompt assembly

pub mod causal;
pub mod compliance;
pub mod config;
#[cfg(feature = "fastembed")]
pub mod embed;
pub mod engine;
pub mod error;
pub mod explain;
pub mod lexical;
pub mod prompt;
pub mod ranking;
pub mod redact;
pub mod vector;

pub use causal::{CausalBlock, CausalChain, CausalityReconstructor, ANCHOR_MARKER};
pub use compliance::{Clock, ComplianceEnricher, FixedClock, SystemClock};
pub use config::{load_config, EngineConfig, OnExisting, RankingWeights};
#[cfg(feature = "fastembed")]
pub use embed::FastEmbedProvider;
pub use engine::{ForensicEngine, ForensicOutput, Investigation};
pub use error::{ForensicError, Result};
pub use explain::{ExplainError, ExplainRequest, Explainer, Explanation, OllamaExplainer};
pub use lexical::LexicalScorer;
pub use prompt::PromptFormatter;
pub use ranking::{validate_top_k, RankedEvidenceSet, RankingEngine, ScoreBreakdown, ScoredChunk};
pub use vector::{EmbeddingProvider, VectorIndex};
