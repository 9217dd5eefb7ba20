//! Core types for forensic evidence ranking
//! this crate contains the data model shared by the ranking engine and the CLI.
pub mod ingest;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// EMBEDDINGS //

/// Embedding dimension used by a default deployment (BGE base / 768-d models)
pub const DEFAULT_DIMENSION: usize = 768;

/// Fixed-dimension embedding vector, produced outside this workspace
pub type Embedding = Vec<f32>;

// LOG CHUNK (unit of evidence)

/// A fragment of log text considered as one unit of retrieval.
/// Owned by the ingestion layer, only borrowed by a ranking request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogChunk {
    pub id: String, // unique chunk identifier

    pub text: String, // raw evidence text

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>, // when the event happened (if known)

    #[serde(default)]
    pub embedding: Option<Embedding>, // precomputed embedding (if ingested with one)
}

impl LogChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            timestamp: None,
            embedding: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

// INDUSTRY

/// Industry module an engine instance is configured for.
/// Decides which compliance rule (if any) applies to reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Industry {
    #[default]
    General,
    Fintech,
    Healthcare,
    Ecommerce,
    Saas,
    Gaming,
}

impl Industry {
    /// Parse industry from its configuration name (case-insensitive)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GENERAL" => Some(Self::General),
            "FINTECH" => Some(Self::Fintech),
            "HEALTHCARE" => Some(Self::Healthcare),
            "ECOMMERCE" | "E-COMMERCE" => Some(Self::Ecommerce),
            "SAAS" => Some(Self::Saas),
            "GAMING" => Some(Self::Gaming),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::Fintech => "FINTECH",
            Self::Healthcare => "HEALTHCARE",
            Self::Ecommerce => "ECOMMERCE",
            Self::Saas => "SAAS",
            Self::Gaming => "GAMING",
        }
    }
}

impl std::fmt::Display for Industry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// FORENSIC REPORT

/// Report field added by compliance enrichment
pub const COMPLIANCE_META_KEY: &str = "compliance_meta";

/// Structured report handed to the language model together with the prompt.
/// Arbitrary fields, plus an optional `compliance_meta` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForensicReport {
    fields: Map<String, Value>,
}

impl ForensicReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a report from a JSON value; anything but an object is rejected
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn compliance_meta(&self) -> Option<&Value> {
        self.fields.get(COMPLIANCE_META_KEY)
    }

    pub fn set_compliance_meta(&mut self, meta: Value) {
        self.fields.insert(COMPLIANCE_META_KEY.to_string(), meta);
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}
