// Explanations - hand a finished investigation to a language model
//
// The forensic prompt goes in as the user turn. The system turn carries the
// audit context from the enriched report, so the answer can be filed with it.

use crate::causal::ANCHOR_MARKER;
use crate::engine::ForensicOutput;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const SYSTEM_PREAMBLE: &str = "You reconstruct production failures from ranked log evidence. \
Evidence blocks are in chronological order.";

#[derive(Error, Debug)]
pub enum ExplainError {
    #[error("Model endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model returned an empty explanation")]
    EmptyAnswer,
}

/// What the model is asked, derived from one investigation
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainRequest {
    pub system: String,
    pub prompt: String,
    pub audit_type: Option<String>,
}

impl ExplainRequest {
    pub fn from_output(output: &ForensicOutput) -> Self {
        let meta = output.report.compliance_meta();
        let audit_type = meta
            .and_then(|m| m.get("audit_type"))
            .and_then(|v| v.as_str())
            .map(String::from);

        let mut system = format!(
            "{} Steps are separated by {}. Name the root cause first.",
            SYSTEM_PREAMBLE,
            ANCHOR_MARKER.trim()
        );
        if let Some(audit_type) = &audit_type {
            let recorded = meta
                .and_then(|m| m.get("timestamp"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown time");
            system.push_str(&format!(
                " This analysis is filed under the {} audit recorded at {}. \
Quote evidence verbatim and do not invent identifiers.",
                audit_type, recorded
            ));
        }

        Self {
            system,
            prompt: output.prompt.clone(),
            audit_type,
        }
    }
}

/// A model answer tied back to the evidence it was given
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub model: String,
    pub text: String,
    pub audit_type: Option<String>,
    pub evidence: Vec<String>,
}

#[async_trait]
pub trait Explainer: Send + Sync {
    /// Send one request, return the raw answer text
    async fn complete(&self, request: &ExplainRequest) -> Result<String, ExplainError>;

    fn model(&self) -> &str;

    async fn explain(&self, output: &ForensicOutput) -> Result<Explanation, ExplainError> {
        let request = ExplainRequest::from_output(output);
        let answer = self.complete(&request).await?;
        let text = answer.trim();
        if text.is_empty() {
            return Err(ExplainError::EmptyAnswer);
        }

        info!(
            model = self.model(),
            evidence = output.selected.len(),
            audited = request.audit_type.is_some(),
            "Explanation received"
        );

        Ok(Explanation {
            model: self.model().to_string(),
            text: text.to_string(),
            audit_type: request.audit_type,
            evidence: output.selected.clone(),
        })
    }
}

/// Ollama chat endpoint, deterministic sampling
#[derive(Debug, Clone)]
pub struct OllamaExplainer {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatReply {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    content: String,
}

impl OllamaExplainer {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn body<'a>(&'a self, request: &'a ExplainRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        }
    }
}

#[async_trait]
impl Explainer for OllamaExplainer {
    async fn complete(&self, request: &ExplainRequest) -> Result<String, ExplainError> {
        debug!(url = %self.chat_url(), model = %self.model, "Requesting explanation");

        let response = self.http.post(self.chat_url()).json(&self.body(request)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExplainError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let reply: ChatReply = response.json().await?;
        Ok(reply.message.content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
