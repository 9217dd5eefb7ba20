//! Engine configuration, loaded from TOML

use crate::error::{ForensicError, Result};
use forensic_core::{Industry, DEFAULT_DIMENSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Main config structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // embedding dimension every vector must have
    pub dimension: usize,

    pub ranking: RankingWeights,

    pub compliance: ComplianceConfig,

    pub prompt: PromptConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            ranking: RankingWeights::default(),
            compliance: ComplianceConfig::default(),
            prompt: PromptConfig::default(),
        }
    }
}

/// Score components and their weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    // boost when the canonical FATAL token appears
    pub fatal_boost: u32,

    // boost when the canonical ERROR token appears
    pub error_boost: u32,

    // boost when the whole query appears in the chunk (case-insensitive)
    pub query_match_boost: u32,

    // cosine similarity [-1, 1] is multiplied by this
    pub vector_weight: f64,

    // bonus given to the newest chunk, halves every half-life
    pub recency_weight: f64,
    pub recency_half_life_secs: f64,

    // score chunks on the rayon pool once a request has this many
    pub parallel_threshold: usize,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            fatal_boost: 100,
            error_boost: 50,
            query_match_boost: 200,
            vector_weight: 100.0,
            recency_weight: 25.0,
            recency_half_life_secs: 3600.0,
            parallel_threshold: 512,
        }
    }
}

// What enrichment does when a report already has compliance_meta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnExisting {
    #[default]
    Reject,
    Replace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    // industry name, e.g. "FINTECH"
    pub industry: String,

    // unknown industry names are an error instead of falling back to GENERAL
    pub strict: bool,

    pub on_existing: OnExisting,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            industry: Industry::General.as_str().to_string(),
            strict: false,
            on_existing: OnExisting::Reject,
        }
    }
}

impl ComplianceConfig {
    /// Resolve the configured industry name.
    /// Unknown names fall back to GENERAL (identity enrichment) unless strict.
    pub fn resolve_industry(&self) -> Result<Industry> {
        match Industry::from_name(&self.industry) {
            Some(industry) => Ok(industry),
            None if self.strict => Err(ForensicError::UnknownIndustry(self.industry.clone())),
            None => {
                tracing::warn!(industry = %self.industry, "Unknown industry, compliance enrichment disabled");
                Ok(Industry::General)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    // mask emails, IPs and API tokens in evidence before it reaches the prompt.
    // Off by default: reconstruction only reorders and joins evidence.
    pub redact_pii: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { redact_pii: false }
    }
}

impl EngineConfig {
    pub fn with_industry(mut self, industry: Industry) -> Self {
        self.compliance.industry = industry.as_str().to_string();
        self
    }

    /// Reject values the ranking math can't work with
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(ForensicError::Config("dimension must be > 0".to_string()));
        }
        let weights = &self.ranking;
        if !weights.vector_weight.is_finite() || !weights.recency_weight.is_finite() {
            return Err(ForensicError::Config("weights must be finite".to_string()));
        }
        if weights.recency_weight < 0.0 {
            return Err(ForensicError::Config("recency_weight must be >= 0".to_string()));
        }
        let half_life = weights.recency_half_life_secs;
        if !half_life.is_finite() || half_life <= 0.0 {
            return Err(ForensicError::Config(
                "recency_half_life_secs must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| ForensicError::Config(format!("{}: {}", path.display(), e)))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<EngineConfig> {
    let config: EngineConfig =
        toml::from_str(content).map_err(|e| ForensicError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
