// Error kinds shared by ranking, reconstruction, enrichment and formatting

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForensicError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding holds a non-numeric or non-finite value at index {0}")]
    NonFiniteEmbedding(usize),

    #[error("Invalid top_k: {0} (must be >= 0)")]
    InvalidTopK(i64),

    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Role must not be empty")]
    EmptyRole,

    #[error("Unknown industry: {0}")]
    UnknownIndustry(String),

    #[error("Report already carries compliance_meta")]
    ComplianceMetaExists,

    #[error("Embedding provider failed: {0}")]
    Embedding(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ForensicError>;
