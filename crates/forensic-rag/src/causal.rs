// Causality reconstructor
//
// Turns ranked evidence into a failure timeline:
// 1. timed blocks first, oldest event first
// 2. untimed blocks after every timed block, in rank order
// 3. equal timestamps keep rank order
// Blocks stay structured until render(), which joins them with ANCHOR_MARKER.

use crate::ranking::RankedEvidenceSet;
use crate::redact::redact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Delimiter between causal steps in rendered evidence
pub const ANCHOR_MARKER: &str = "\n[CAUSAL_ANCHOR]\n";

/// One step of the reconstructed narrative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalBlock {
    pub chunk_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    // 0-based position in the ranked evidence
    pub rank: usize,
    pub score: f64,
    pub text: String,
}

/// Ordered failure narrative, built once per request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CausalChain {
    blocks: Vec<CausalBlock>,
}

impl CausalChain {
    pub fn blocks(&self) -> &[CausalBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Evidence text: blocks joined by ANCHOR_MARKER (N blocks, N-1 markers)
    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(ANCHOR_MARKER)
    }
}

// timed before untimed, then chronological; stable sort keeps rank order on ties
fn chronological(a: &CausalBlock, b: &CausalBlock) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Default)]
pub struct CausalityReconstructor {
    redact_pii: bool,
}

impl CausalityReconstructor {
    pub fn new(redact_pii: bool) -> Self {
        Self { redact_pii }
    }

    pub fn reconstruct(&self, evidence: &RankedEvidenceSet<'_>) -> CausalChain {
        let mut blocks: Vec<CausalBlock> = evidence
            .iter()
            .enumerate()
            .map(|(rank, scored)| CausalBlock {
                chunk_id: scored.chunk.id.clone(),
                timestamp: scored.chunk.timestamp,
                rank,
                score: scored.score,
                text: if self.redact_pii {
                    redact(&scored.chunk.text)
                } else {
                    scored.chunk.text.clone()
                },
            })
            .collect();

        blocks.sort_by(chronological);

        tracing::debug!(
            blocks = blocks.len(),
            untimed = blocks.iter().filter(|b| b.timestamp.is_none()).count(),
            "Causal chain reconstructed"
        );

        CausalChain { blocks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ranking::RankingEngine;
    use chrono::TimeZone;
    use forensic_core::LogChunk;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn rank_all(chunks: &[LogChunk]) -> RankedEvidenceSet<'_> {
        RankingEngine::new(&EngineConfig::default())
            .rank("", chunks, chunks.len())
            .unwrap()
    }

    fn ids(chain: &CausalChain) -> Vec<&str> {
        chain.blocks().iter().map(|b| b.chunk_id.as_str()).collect()
    }

    #[test]
    fn test_timed_blocks_are_chronological() {
        let chunks = vec![
            LogChunk::new("crash", "FATAL: OOMKilled").with_timestamp(at(30)),
            LogChunk::new("warn", "ERROR: memory at 95%").with_timestamp(at(10)),
            LogChunk::new("deploy", "INFO: deploy v2").with_timestamp(at(5)),
        ];
        let chain = CausalityReconstructor::default().reconstruct(&rank_all(&chunks));

        assert_eq!(ids(&chain), vec!["deploy", "warn", "crash"]);
        // rank is remembered even though the order changed
        assert_eq!(chain.blocks()[2].rank, 0);
    }

    #[test]
    fn test_untimed_blocks_go_last_in_rank_order() {
        let chunks = vec![
            LogChunk::new("u1", "FATAL: no clock"),
            LogChunk::new("t2", "ERROR: late").with_timestamp(at(20)),
            LogChunk::new("u2", "ERROR: no clock either"),
            LogChunk::new("t1", "early").with_timestamp(at(10)),
        ];
        let chain = CausalityReconstructor::default().reconstruct(&rank_all(&chunks));

        // rank order is u1, t2, u2, t1
        assert_eq!(ids(&chain), vec!["t1", "t2", "u1", "u2"]);
    }

    #[test]
    fn test_equal_timestamps_keep_rank_order() {
        let chunks = vec![
            LogChunk::new("low", "INFO").with_timestamp(at(7)),
            LogChunk::new("high", "FATAL").with_timestamp(at(7)),
        ];
        let chain = CausalityReconstructor::default().reconstruct(&rank_all(&chunks));
        assert_eq!(ids(&chain), vec!["high", "low"]);
    }

    #[test]
    fn test_anchor_counts() {
        let single = vec![LogChunk::new("a", "FATAL: only")];
        let chain = CausalityReconstructor::default().reconstruct(&rank_all(&single));
        assert_eq!(chain.render(), "FATAL: only");
        assert!(!chain.render().contains("[CAUSAL_ANCHOR]"));

        let many: Vec<LogChunk> = (0..5).map(|i| LogChunk::new(format!("c{i}"), "x")).collect();
        let chain = CausalityReconstructor::default().reconstruct(&rank_all(&many));
        assert_eq!(chain.render().matches(ANCHOR_MARKER).count(), 4);
    }

    #[test]
    fn test_empty_evidence() {
        let chain = CausalityReconstructor::default().reconstruct(&RankedEvidenceSet::default());
        assert!(chain.is_empty());
        assert_eq!(chain.render(), "");
    }

    #[test]
    fn test_reconstructing_rendered_output_is_a_noop() {
        let chunks = vec![
            LogChunk::new("a", "ERROR: db down").with_timestamp(at(2)),
            LogChunk::new("b", "FATAL: api crash").with_timestamp(at(3)),
        ];
        let rendered = CausalityReconstructor::new(true)
            .reconstruct(&rank_all(&chunks))
            .render();

        let again = vec![LogChunk::new("chain", rendered.clone())];
        let chain = CausalityReconstructor::new(true).reconstruct(&rank_all(&again));
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.render(), rendered);
    }

    #[test]
    fn test_redaction_applies_to_blocks() {
        let chunks = vec![LogChunk::new("a", "ERROR: login failed for ops@example.com")];
        let redacted = CausalityReconstructor::new(true).reconstruct(&rank_all(&chunks));
        let raw = CausalityReconstructor::new(false).reconstruct(&rank_all(&chunks));

        assert!(!redacted.render().contains("ops@example.com"));
        assert!(raw.render().contains("ops@example.com"));
    }
}
