// Forensic engine
// Orchestrates: Ranking -> Causality reconstruction -> Compliance enrichment -> Prompt

use crate::causal::{CausalChain, CausalityReconstructor};
use crate::compliance::{Clock, ComplianceEnricher, SystemClock};
use crate::config::{EngineConfig, OnExisting};
use crate::error::Result;
use crate::prompt::PromptFormatter;
use crate::ranking::{RankedEvidenceSet, RankingEngine};
use crate::vector::EmbeddingProvider;
use forensic_core::{ForensicReport, Industry, LogChunk};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// One investigation request
#[derive(Debug, Clone)]
pub struct Investigation {
    pub role: String,
    pub query: String,
    pub top_k: usize,
}

/// Everything the language-model caller needs
#[derive(Debug, Clone, Serialize)]
pub struct ForensicOutput {
    pub prompt: String,
    pub chain: CausalChain,
    pub report: ForensicReport,
    // chunk ids in rank order
    pub selected: Vec<String>,
    // chunk ids dropped for embedding errors
    pub excluded: Vec<String>,
}

pub struct ForensicEngine {
    industry: Industry,
    on_existing: OnExisting,
    ranking: RankingEngine,
    reconstructor: CausalityReconstructor,
    enricher: ComplianceEnricher,
}

impl ForensicEngine {
    /// Build an engine; the industry is resolved once and fixed for its lifetime
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let industry = config.compliance.resolve_industry()?;

        info!(industry = %industry, dimension = config.dimension, "Forensic engine ready");

        Ok(Self {
            industry,
            on_existing: config.compliance.on_existing,
            ranking: RankingEngine::new(&config),
            reconstructor: CausalityReconstructor::new(config.prompt.redact_pii),
            enricher: ComplianceEnricher::new(Arc::new(SystemClock), config.compliance.on_existing),
        })
    }

    /// Swap the audit time source (tests pin it with a FixedClock)
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self {
            enricher: ComplianceEnricher::new(clock, self.on_existing),
            ..self
        }
    }

    pub fn with_embedding_provider(self, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        info!(provider = provider.name(), "Embedding provider attached");
        let ranking = self.ranking.with_provider(provider)?;
        Ok(Self { ranking, ..self })
    }

    pub fn industry(&self) -> Industry {
        self.industry
    }

    pub fn rank<'a>(&self, query: &str, chunks: &'a [LogChunk], top_k: usize) -> Result<RankedEvidenceSet<'a>> {
        self.ranking.rank(query, chunks, top_k)
    }

    pub fn reconstruct(&self, evidence: &RankedEvidenceSet<'_>) -> CausalChain {
        self.reconstructor.reconstruct(evidence)
    }

    pub fn enrich(&self, report: ForensicReport) -> Result<ForensicReport> {
        self.enricher.enrich(report, self.industry)
    }

    /// Run the whole pipeline. Role and query are checked before any work is done.
    pub fn investigate(
        &self,
        request: &Investigation,
        chunks: &[LogChunk],
        report: ForensicReport,
    ) -> Result<ForensicOutput> {
        // fail fast on formatting preconditions
        PromptFormatter::format_text(&request.role, &request.query, "")?;

        let evidence = self.rank(&request.query, chunks, request.top_k)?;
        let chain = self.reconstruct(&evidence);
        let report = self.enrich(report)?;
        let prompt = PromptFormatter::format(&request.role, &request.query, &chain)?;

        info!(
            selected = evidence.len(),
            excluded = evidence.excluded.len(),
            industry = %self.industry,
            prompt_len = prompt.len(),
            "Investigation assembled"
        );

        Ok(ForensicOutput {
            prompt,
            selected: evidence.ids().into_iter().map(String::from).collect(),
            excluded: evidence.excluded.iter().map(|e| e.id.clone()).collect(),
            chain,
            report,
        })
    }
}
