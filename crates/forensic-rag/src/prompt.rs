// Prompt formatter - persona, goal, evidence, query

use crate::causal::CausalChain;
use crate::error::{ForensicError, Result};

pub const GOAL: &str = "Forensic Reconstruction";

pub struct PromptFormatter;

impl PromptFormatter {
    /// Render a causal chain into the final prompt text
    pub fn format(role: &str, query: &str, chain: &CausalChain) -> Result<String> {
        Self::format_text(role, query, &chain.render())
    }

    /// Same template for evidence that is already rendered text
    pub fn format_text(role: &str, query: &str, evidence: &str) -> Result<String> {
        if role.trim().is_empty() {
            return Err(ForensicError::EmptyRole);
        }
        if query.trim().is_empty() {
            return Err(ForensicError::EmptyQuery);
        }

        Ok(format!(
            "PERSONA: {}\nGOAL: {}\nEVIDENCE:\n{}\nQUERY: {}",
            role, GOAL, evidence, query
        ))
    }
}
