//! Stream frame parser for the incremental answer exchange.
//!
//! The service delivers newline-delimited events; only lines starting with
//! the `data: ` prefix carry payloads, and payloads are classified by shape:
//! `{delta}` (incremental text), `{answer, sources, confidence, ...}`
//! (terminal record), or `{error}` (failure). Everything else on the stream
//! is protocol noise. A single malformed frame is logged and skipped, never
//! failing the whole exchange.

use serde::Deserialize;

use sibyl_core::types::{ConfidenceLevel, SavedArtifact, Source};

/// Prefix marking a payload-carrying line.
pub const EVENT_PREFIX: &str = "data: ";

/// One discrete unit of data parsed out of the incremental stream.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// Incremental text fragment to append to the answer.
    Delta(String),
    /// Terminal record carrying evidence, confidence, and (optionally) the
    /// full authoritative answer text.
    Final(FinalFrame),
    /// Service-side failure; carries the error detail.
    Error(String),
}

/// Payload of a terminal stream record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FinalFrame {
    pub message_id: Option<String>,
    /// Full answer text when the service replays it at the end; empty when
    /// the deltas already carried everything.
    pub answer: String,
    pub sources: Vec<Source>,
    pub confidence: ConfidenceLevel,
    pub saved_file: Option<String>,
    pub saved_document: Option<SavedArtifact>,
}

/// Superset of all recognized payload shapes, classified after parsing.
#[derive(Deserialize)]
struct RawFrame {
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    sources: Vec<Source>,
    #[serde(default)]
    confidence: ConfidenceLevel,
    #[serde(default)]
    saved_file: Option<String>,
    #[serde(default)]
    saved_document: Option<SavedArtifact>,
}

/// Splits an incremental byte stream into discrete frames.
///
/// Holds no state beyond the pending partial line, so feeding the same
/// chunk sequence to two parsers yields the same frame sequence regardless
/// of where the chunk boundaries fall.
#[derive(Debug, Default)]
pub struct FrameParser {
    pending: Vec<u8>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one chunk and returns every frame completed by it, in
    /// arrival order. The remainder of an unterminated final line is held
    /// until the next `feed`.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let rest = self.pending.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.pending, rest);
            line.pop(); // trailing '\n'
            if let Some(frame) = parse_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Drains a final unterminated line at end-of-stream, if any.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        parse_line(&line)
    }

    /// Number of buffered bytes awaiting a terminating newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Parses one complete line into a frame, or `None` for noise and malformed
/// payloads.
fn parse_line(line: &[u8]) -> Option<Frame> {
    let line = match std::str::from_utf8(line) {
        Ok(s) => s,
        Err(_) => {
            tracing::warn!("Discarding non-UTF-8 stream line");
            return None;
        }
    };
    let line = line.strip_suffix('\r').unwrap_or(line);

    // Lines without the event prefix (SSE `event:` lines, keep-alives,
    // blanks) are protocol noise.
    let payload = line.strip_prefix(EVENT_PREFIX)?;

    let raw: RawFrame = match serde_json::from_str(payload) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding malformed stream frame");
            return None;
        }
    };

    if let Some(delta) = raw.delta {
        return Some(Frame::Delta(delta));
    }
    if let Some(error) = raw.error {
        return Some(Frame::Error(error));
    }
    if let Some(answer) = raw.answer {
        return Some(Frame::Final(FinalFrame {
            message_id: raw.message_id,
            answer,
            sources: raw.sources,
            confidence: raw.confidence,
            saved_file: raw.saved_file,
            saved_document: raw.saved_document,
        }));
    }

    tracing::warn!("Discarding stream frame matching no known shape");
    None
}

// =============================================================================
// Tests
// =============================================================================
