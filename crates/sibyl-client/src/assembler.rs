//! Response assembly: folds stream frames or a whole response into one
//! [`AssembledAnswer`].
//!
//! The same semantic order applies in every transport mode; streamed turns
//! just take more intermediate steps. Text accumulates append-only, with one
//! exception: a terminal record carrying a non-empty answer is authoritative
//! and overwrites the accumulated deltas (the service replays the full text
//! at the end of a stream).

use sibyl_core::types::{AssembledAnswer, SavedArtifact};

use crate::frame::{FinalFrame, Frame};
use crate::types::ChatResponse;

/// Effect of applying one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// A delta was appended; the turn continues.
    Appended,
    /// The terminal record arrived; the turn is complete.
    Finalized,
    /// The service reported a failure; carries the error detail. Text
    /// appended so far stays on the answer for display.
    Failed(String),
}

/// Accumulates a turn's output across all three transport modes.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    answer: AssembledAnswer,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The answer assembled so far.
    pub fn answer(&self) -> &AssembledAnswer {
        &self.answer
    }

    /// Snapshot of the current state, for progress notifications.
    pub fn snapshot(&self) -> AssembledAnswer {
        self.answer.clone()
    }

    /// Consumes the assembler, yielding the assembled (possibly partial)
    /// answer.
    pub fn into_answer(self) -> AssembledAnswer {
        self.answer
    }

    /// Applies one stream frame in arrival order.
    pub fn apply_frame(&mut self, frame: Frame) -> FrameOutcome {
        match frame {
            Frame::Delta(delta) => {
                self.answer.push_delta(&delta);
                FrameOutcome::Appended
            }
            Frame::Final(record) => {
                self.apply_terminal_record(record);
                FrameOutcome::Finalized
            }
            Frame::Error(detail) => FrameOutcome::Failed(detail),
        }
    }

    /// Applies a whole non-streamed response (`Normal`/`Agentic` modes):
    /// the answer text is set exactly once, atomically.
    pub fn apply_final_response(&mut self, response: ChatResponse) {
        self.answer.message_id = response.message_id;
        self.answer.text = response.answer;
        self.answer.sources = response.sources;
        self.answer.confidence = response.confidence;
        self.answer.reasoning_trace = response.reasoning_trace.unwrap_or_default();
        self.answer.loops_used = response.loops_used;
        self.set_persistence(response.saved_document, response.saved_file);
    }

    fn apply_terminal_record(&mut self, record: FinalFrame) {
        if record.message_id.is_some() {
            self.answer.message_id = record.message_id;
        }
        // Authoritative overwrite only when the record carries text.
        if !record.answer.is_empty() {
            self.answer.text = record.answer;
        }
        self.answer.sources = record.sources;
        self.answer.confidence = record.confidence;
        self.set_persistence(record.saved_document, record.saved_file);
    }

    /// Persistence is set at most once; a document descriptor beats a bare
    /// file path.
    fn set_persistence(&mut self, document: Option<SavedArtifact>, file: Option<String>) {
        if self.answer.persistence.is_some() {
            return;
        }
        self.answer.persistence = document.or_else(|| {
            file.map(|path| SavedArtifact {
                filename: None,
                path,
            })
        });
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sibyl_core::types::{ConfidenceLevel, Source, StepKind};

    fn source(origin: &str) -> Source {
        Source {
            origin: origin.to_string(),
            fragment_id: format!("{}::0", origin),
            snippet: "snippet".to_string(),
            relevance_score: 0.5,
        }
    }

    fn final_frame(answer: &str) -> FinalFrame {
        FinalFrame {
            message_id: Some("m-1".to_string()),
            answer: answer.to_string(),
            sources: vec![source("a.md")],
            confidence: ConfidenceLevel::High,
            saved_file: None,
            saved_document: None,
        }
    }

    fn chat_response(answer: &str) -> ChatResponse {
        serde_json::from_value(serde_json::json!({
            "message_id": "m-2",
            "answer": answer,
            "sources": [
                {"source": "b.md", "chunk_id": "b.md::1", "snippet": "s", "score": 0.7}
            ],
            "confidence": "low"
        }))
        .unwrap()
    }

    // ---- Delta application ----

    #[test]
    fn test_deltas_append_in_order() {
        let mut assembler = ResponseAssembler::new();
        for delta in ["Hel", "lo, ", "world"] {
            let outcome = assembler.apply_frame(Frame::Delta(delta.to_string()));
            assert_eq!(outcome, FrameOutcome::Appended);
        }
        assert_eq!(assembler.answer().text, "Hello, world");
    }

    #[test]
    fn test_snapshot_reflects_progress() {
        let mut assembler = ResponseAssembler::new();
        assembler.apply_frame(Frame::Delta("partial".to_string()));
        let snapshot = assembler.snapshot();
        assembler.apply_frame(Frame::Delta(" more".to_string()));
        assert_eq!(snapshot.text, "partial");
        assert_eq!(assembler.answer().text, "partial more");
    }

    // ---- Terminal record ----

    #[test]
    fn test_final_frame_sets_evidence_and_confidence() {
        let mut assembler = ResponseAssembler::new();
        let outcome = assembler.apply_frame(Frame::Final(final_frame("full answer")));
        assert_eq!(outcome, FrameOutcome::Finalized);

        let answer = assembler.into_answer();
        assert_eq!(answer.text, "full answer");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.confidence, ConfidenceLevel::High);
        assert_eq!(answer.message_id.as_deref(), Some("m-1"));
    }

    #[test]
    fn test_final_answer_overwrites_accumulated_deltas() {
        // Services that replay the full text at the end win over the deltas.
        let mut assembler = ResponseAssembler::new();
        assembler.apply_frame(Frame::Delta("Hell".to_string()));
        assembler.apply_frame(Frame::Delta("o wor".to_string()));
        assembler.apply_frame(Frame::Final(final_frame("Hello world, complete")));
        assert_eq!(assembler.answer().text, "Hello world, complete");
    }

    #[test]
    fn test_final_without_text_keeps_deltas() {
        let mut assembler = ResponseAssembler::new();
        assembler.apply_frame(Frame::Delta("assembled from deltas".to_string()));
        assembler.apply_frame(Frame::Final(final_frame("")));
        assert_eq!(assembler.answer().text, "assembled from deltas");
        assert_eq!(assembler.answer().confidence, ConfidenceLevel::High);
    }

    #[test]
    fn test_sources_keep_service_order() {
        let mut assembler = ResponseAssembler::new();
        let mut record = final_frame("done");
        record.sources = vec![source("z.md"), source("a.md"), source("m.md")];
        assembler.apply_frame(Frame::Final(record));

        let origins: Vec<&str> = assembler
            .answer()
            .sources
            .iter()
            .map(|s| s.origin.as_str())
            .collect();
        assert_eq!(origins, vec!["z.md", "a.md", "m.md"]);
    }

    // ---- Error frame ----

    #[test]
    fn test_error_frame_fails_but_preserves_text() {
        let mut assembler = ResponseAssembler::new();
        assembler.apply_frame(Frame::Delta("partial answer".to_string()));
        let outcome = assembler.apply_frame(Frame::Error("model overloaded".to_string()));
        assert_eq!(outcome, FrameOutcome::Failed("model overloaded".to_string()));
        assert_eq!(assembler.answer().text, "partial answer");
    }

    #[test]
    fn test_error_frame_with_no_prior_text() {
        let mut assembler = ResponseAssembler::new();
        let outcome = assembler.apply_frame(Frame::Error("store not ready".to_string()));
        assert_eq!(outcome, FrameOutcome::Failed("store not ready".to_string()));
        assert!(assembler.answer().text.is_empty());
    }

    // ---- Whole-response path ----

    #[test]
    fn test_apply_final_response_sets_all_fields() {
        let mut assembler = ResponseAssembler::new();
        assembler.apply_final_response(chat_response("complete"));

        let answer = assembler.into_answer();
        assert_eq!(answer.text, "complete");
        assert_eq!(answer.message_id.as_deref(), Some("m-2"));
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.confidence, ConfidenceLevel::Low);
        assert!(answer.reasoning_trace.is_empty());
    }

    #[test]
    fn test_apply_final_response_with_trace() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "message_id": "m-3",
            "answer": "agentic answer",
            "sources": [],
            "confidence": "high",
            "reasoning_trace": [
                {"step": "retrieve", "query": "q"},
                {"step": "draft"},
                {"step": "critique", "decision": "final"},
                {"step": "finalize"}
            ],
            "loops_used": 1
        }))
        .unwrap();

        let mut assembler = ResponseAssembler::new();
        assembler.apply_final_response(response);

        let answer = assembler.into_answer();
        assert_eq!(answer.reasoning_trace.len(), 4);
        assert_eq!(answer.reasoning_trace[0].kind, StepKind::Retrieve);
        assert_eq!(answer.reasoning_trace[3].kind, StepKind::Finalize);
        assert_eq!(answer.loops_used, Some(1));
    }

    // ---- Persistence ----

    #[test]
    fn test_saved_document_preferred_over_saved_file() {
        let mut record = final_frame("done");
        record.saved_document = Some(SavedArtifact {
            filename: Some("answer.md".to_string()),
            path: "knowledge/answer.md".to_string(),
        });
        record.saved_file = Some("outputs/answer.txt".to_string());

        let mut assembler = ResponseAssembler::new();
        assembler.apply_frame(Frame::Final(record));

        let persistence = assembler.into_answer().persistence.unwrap();
        assert_eq!(persistence.path, "knowledge/answer.md");
        assert_eq!(persistence.filename.as_deref(), Some("answer.md"));
    }

    #[test]
    fn test_saved_file_alone_becomes_artifact() {
        let mut record = final_frame("done");
        record.saved_file = Some("outputs/answer.txt".to_string());

        let mut assembler = ResponseAssembler::new();
        assembler.apply_frame(Frame::Final(record));

        let persistence = assembler.into_answer().persistence.unwrap();
        assert_eq!(persistence.path, "outputs/answer.txt");
        assert!(persistence.filename.is_none());
    }

    #[test]
    fn test_persistence_set_at_most_once() {
        let mut first = final_frame("done");
        first.saved_file = Some("first.txt".to_string());
        let mut second = final_frame("done again");
        second.saved_file = Some("second.txt".to_string());

        let mut assembler = ResponseAssembler::new();
        assembler.apply_frame(Frame::Final(first));
        assembler.apply_frame(Frame::Final(second));

        assert_eq!(assembler.into_answer().persistence.unwrap().path, "first.txt");
    }

    #[test]
    fn test_no_persistence_when_nothing_saved() {
        let mut assembler = ResponseAssembler::new();
        assembler.apply_frame(Frame::Final(final_frame("done")));
        assert!(assembler.into_answer().persistence.is_none());
    }
}
