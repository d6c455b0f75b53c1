//! Wire request/response shapes for the answering service.

use serde::{Deserialize, Serialize};

use sibyl_core::types::{
    AnswerMode, ConfidenceLevel, ReasoningStep, RetrievalMode, SavedArtifact, Source,
};

/// Request body for `POST /chat` and `POST /chat/stream`.
///
/// The streamed endpoint consumes the same shape; agentic turns differ only
/// by `agentic_mode` and the loop budget.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub thread_id: String,
    pub message: String,
    pub top_k: u32,
    pub save_to_file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub save_as_document: bool,
    pub retrieval_mode: RetrievalMode,
    pub answer_mode: AnswerMode,
    pub agentic_mode: bool,
    pub max_loops: u32,
}

/// Response body of `POST /chat`.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub message_id: Option<String>,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub confidence: ConfidenceLevel,
    #[serde(default)]
    pub saved_file: Option<String>,
    #[serde(default)]
    pub saved_document: Option<SavedArtifact>,
    #[serde(default)]
    pub reasoning_trace: Option<Vec<ReasoningStep>>,
    #[serde(default)]
    pub loops_used: Option<u32>,
}

/// Response body of `GET /health`.
#[derive(Clone, Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub vectorstore_ready: bool,
    #[serde(default)]
    pub doc_count: usize,
}

/// Error body carried by non-2xx responses.
#[derive(Clone, Debug, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}
