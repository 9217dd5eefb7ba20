// Lexical scorer - severity keywords and whole-query matches
//
// Rules run in a fixed order so equal scores are reproducible:
//   1. severity tokens, case-sensitive: "FATAL" and "ERROR" (additive)
//   2. the whole query text, untrimmed, as a case-insensitive substring
// "error" or "Fatal" in lowercase/mixed case never triggers rule 1.

use crate::config::RankingWeights;

pub const FATAL_TOKEN: &str = "FATAL";
pub const ERROR_TOKEN: &str = "ERROR";

#[derive(Debug, Clone)]
pub struct LexicalScorer {
    fatal_boost: u32,
    error_boost: u32,
    query_match_boost: u32,
}

impl LexicalScorer {
    pub fn new(weights: &RankingWeights) -> Self {
        Self {
            fatal_boost: weights.fatal_boost,
            error_boost: weights.error_boost,
            query_match_boost: weights.query_match_boost,
        }
    }

    pub fn score(&self, query: &str, chunk_text: &str) -> u32 {
        let mut score = self.severity_score(chunk_text);
        if Self::matches_query(query, chunk_text) {
            score = score.saturating_add(self.query_match_boost);
        }
        score
    }

    fn severity_score(&self, chunk_text: &str) -> u32 {
        let mut score = 0u32;
        if chunk_text.contains(FATAL_TOKEN) {
            score = score.saturating_add(self.fatal_boost);
        }
        if chunk_text.contains(ERROR_TOKEN) {
            score = score.saturating_add(self.error_boost);
        }
        score
    }

    // an empty query matches nothing
    fn matches_query(query: &str, chunk_text: &str) -> bool {
        if query.is_empty() {
            return false;
        }
        chunk_text.to_lowercase().contains(&query.to_lowercase())
    }
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self::new(&RankingWeights::default())
    }
}
