use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Service-supplied qualitative reliability label for an answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    /// Assumed until the service supplies a value.
    #[default]
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Returns the wire/display label for this level.
    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}

/// Retrieval strategy requested from the service. Forwarded opaquely; the
/// client attaches no semantics beyond the wire name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    #[default]
    Similarity,
    Mmr,
}

/// Answer composition strategy requested from the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    #[default]
    Strict,
    Balanced,
    Creative,
}

/// Kind of step in an agentic reasoning trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// A retrieval pass against the knowledge base (one per loop).
    Retrieve,
    /// Draft answer generation.
    Draft,
    /// Self-check of the draft against the gathered evidence.
    Critique,
    /// Query rewrite before another retrieval pass.
    Refine,
    /// Final answer selection. Always last when present.
    Finalize,
    /// Service-side step failure. Always last when present.
    Error,
}

impl StepKind {
    /// Maps a wire step name to a kind.
    ///
    /// The service emits `refine_query` for the query-rewrite step;
    /// unrecognized names fold into `Error` so traces stay complete.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "retrieve" => StepKind::Retrieve,
            "draft" => StepKind::Draft,
            "critique" => StepKind::Critique,
            "refine" | "refine_query" => StepKind::Refine,
            "finalize" => StepKind::Finalize,
            _ => StepKind::Error,
        }
    }
}

// =============================================================================
// Identity and time newtypes
// =============================================================================

/// Unique identifier for a turn, generated client-side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in seconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }
}

// =============================================================================
// Evidence and reasoning
// =============================================================================

/// A cited document fragment backing part of an answer.
///
/// Sources arrive in service relevance order and are never re-sorted
/// client-side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// File the fragment was retrieved from.
    #[serde(rename = "source")]
    pub origin: String,
    /// Identifier of the indexed chunk.
    #[serde(rename = "chunk_id")]
    pub fragment_id: String,
    /// Excerpt shown alongside the citation.
    pub snippet: String,
    /// Similarity score. Absent on the wire defaults to 0.0.
    #[serde(rename = "score", default)]
    pub relevance_score: f64,
}

/// One entry of the service's multi-pass reasoning trace (agentic mode only).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireReasoningStep")]
pub struct ReasoningStep {
    pub kind: StepKind,
    /// The step's retrieval query, decision, or error message, when carried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ReasoningStep {
    pub fn new(kind: StepKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn with_detail(kind: StepKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }
}

/// Wire shape of a trace entry: `{step, query?, decision?, loop?, message?}`.
#[derive(Deserialize)]
struct WireReasoningStep {
    #[serde(default)]
    step: String,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    decision: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl From<WireReasoningStep> for ReasoningStep {
    fn from(wire: WireReasoningStep) -> Self {
        let kind = StepKind::from_wire(&wire.step);
        let detail = wire.query.or(wire.decision).or(wire.message).or_else(|| {
            // Preserve an unrecognized step name rather than dropping it.
            if kind == StepKind::Error && !wire.step.is_empty() && wire.step != "error" {
                Some(wire.step)
            } else {
                None
            }
        });
        Self { kind, detail }
    }
}

/// Descriptor of an answer the service persisted server-side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedArtifact {
    /// Filename when the answer was saved as a structured document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Server-side path of the saved artifact.
    pub path: String,
}

// =============================================================================
// AssembledAnswer
// =============================================================================

/// The accumulating output of a turn, shared by all three transport modes.
///
/// `text` is append-only while streaming; a terminal record carrying a
/// complete answer overwrites it (the service replays full text at the end).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AssembledAnswer {
    /// Service-assigned message id, once known.
    pub message_id: Option<String>,
    pub text: String,
    pub sources: Vec<Source>,
    pub confidence: ConfidenceLevel,
    /// Empty outside agentic mode.
    pub reasoning_trace: Vec<ReasoningStep>,
    /// Loop count reported by the service (agentic, non-streamed only).
    pub loops_used: Option<u32>,
    /// Set at most once.
    pub persistence: Option<SavedArtifact>,
}

impl AssembledAnswer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an incremental text fragment. Never replaces existing text.
    pub fn push_delta(&mut self, delta: &str) {
        self.text.push_str(delta);
    }

    /// True once any output has accumulated.
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
