//! Session controller: the turn state machine.
//!
//! Owns the at-most-one-in-flight-turn invariant, drives the transport,
//! frame parser, and assembler, and emits ordered lifecycle events to a
//! per-turn channel. Each turn runs as one spawned task; cancellation is
//! cooperative and observed at the exchange's suspension points.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sibyl_core::config::TurnConfig;
use sibyl_core::events::TurnEvent;
use sibyl_core::turn::{Turn, TurnMode, TurnStatus};
use sibyl_core::types::{AssembledAnswer, Timestamp, TurnId};

use crate::assembler::{FrameOutcome, ResponseAssembler};
use crate::error::TurnError;
use crate::frame::FrameParser;
use crate::transport::Transport;
use crate::types::ChatRequest;

/// Per-turn request values. Anything left unset falls back to the
/// controller's [`TurnConfig`] defaults.
#[derive(Clone, Debug, Default)]
pub struct TurnRequest {
    pub message: String,
    pub mode: TurnMode,
    pub top_k: Option<u32>,
    pub max_loops: Option<u32>,
    pub save_to_file: bool,
    pub file_name: Option<String>,
    pub save_as_document: Option<bool>,
}

impl TurnRequest {
    /// Convenience constructor for a plain question in the given mode.
    pub fn new(message: impl Into<String>, mode: TurnMode) -> Self {
        Self {
            message: message.into(),
            mode,
            ..Self::default()
        }
    }
}

/// Handle to a started turn: identity, lifecycle event stream, and status.
///
/// Dropping the handle detaches the presentation side; the turn task still
/// runs to its terminal state.
#[derive(Debug)]
pub struct TurnHandle {
    id: TurnId,
    mode: TurnMode,
    events: mpsc::UnboundedReceiver<TurnEvent>,
    cancel: CancellationToken,
    turn: Arc<Mutex<Turn>>,
}

impl TurnHandle {
    pub fn id(&self) -> TurnId {
        self.id
    }

    /// Mode chosen at turn start; immutable for the turn's lifetime.
    pub fn mode(&self) -> TurnMode {
        self.mode
    }

    pub fn status(&self) -> TurnStatus {
        match self.turn.lock() {
            Ok(guard) => guard.status,
            Err(poisoned) => poisoned.into_inner().status,
        }
    }

    /// Next lifecycle event, or `None` once the terminal event has been
    /// consumed and the turn task is gone.
    pub async fn next_event(&mut self) -> Option<TurnEvent> {
        self.events.recv().await
    }
}

/// Bookkeeping for the single turn allowed in flight.
struct InFlight {
    id: TurnId,
    cancel: CancellationToken,
    turn: Arc<Mutex<Turn>>,
}

/// Conducts turns against the answering service, one at a time.
pub struct SessionController {
    transport: Transport,
    defaults: TurnConfig,
    /// Last observed knowledge-base document count. `None` until the first
    /// health observation; only a known-empty store blocks turns.
    document_count: Mutex<Option<usize>>,
    current: Mutex<Option<InFlight>>,
}

impl SessionController {
    pub fn new(transport: Transport, defaults: TurnConfig) -> Self {
        Self {
            transport,
            defaults,
            document_count: Mutex::new(None),
            current: Mutex::new(None),
        }
    }

    /// Records the knowledge-base document count observed from the service
    /// health endpoint. A count of zero makes `start_turn` reject before
    /// issuing any request.
    pub fn update_document_count(&self, count: usize) {
        match self.document_count.lock() {
            Ok(mut guard) => *guard = Some(count),
            Err(poisoned) => *poisoned.into_inner() = Some(count),
        }
    }

    /// Starts one turn. Must be called from within a tokio runtime.
    ///
    /// Rejects empty input and a known-empty knowledge base without any
    /// network traffic. If another turn is still in flight it is implicitly
    /// cancelled before the new turn starts; its own event channel receives
    /// the abort, so output from the two turns never interleaves.
    pub fn start_turn(&self, request: TurnRequest) -> Result<TurnHandle, TurnError> {
        if request.message.trim().is_empty() {
            return Err(TurnError::EmptyMessage);
        }
        if self.knowledge_known_empty() {
            return Err(TurnError::EmptyKnowledgeBase);
        }

        let mode = request.mode;
        let turn = Turn::new(mode);
        let id = turn.id;
        let cancel = CancellationToken::new();
        let turn = Arc::new(Mutex::new(turn));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        self.replace_in_flight(InFlight {
            id,
            cancel: cancel.clone(),
            turn: Arc::clone(&turn),
        })?;

        let wire = self.build_request(&request);
        let transport = self.transport.clone();
        let task_cancel = cancel.clone();
        let task_turn = Arc::clone(&turn);

        tokio::spawn(async move {
            run_turn(transport, wire, id, mode, task_turn, task_cancel, events_tx).await;
        });

        tracing::info!(turn_id = %id, mode = ?mode, "Turn started");

        Ok(TurnHandle {
            id,
            mode,
            events: events_rx,
            cancel,
            turn,
        })
    }

    /// Cancels the given turn. Observed at the turn's next suspension
    /// point; a no-op once the turn is terminal.
    pub fn cancel(&self, handle: &TurnHandle) {
        tracing::info!(turn_id = %handle.id, "Turn cancellation requested");
        handle.cancel.cancel();
    }

    /// Cancels whatever turn is currently in flight, if any.
    pub fn cancel_current(&self) {
        let guard = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(entry) = guard.as_ref() {
            tracing::info!(turn_id = %entry.id, "Cancelling in-flight turn");
            entry.cancel.cancel();
        }
    }

    // -- Private helpers --

    fn knowledge_known_empty(&self) -> bool {
        match self.document_count.lock() {
            Ok(guard) => *guard == Some(0),
            Err(poisoned) => *poisoned.into_inner() == Some(0),
        }
    }

    fn replace_in_flight(&self, next: InFlight) -> Result<(), TurnError> {
        let mut guard = self
            .current
            .lock()
            .map_err(|e| TurnError::Internal(format!("turn registry lock poisoned: {}", e)))?;

        if let Some(prior) = guard.take() {
            let prior_status = match prior.turn.lock() {
                Ok(s) => s.status,
                Err(poisoned) => poisoned.into_inner().status,
            };
            if !prior_status.is_terminal() {
                tracing::info!(turn_id = %prior.id, "Implicitly cancelling prior turn");
                prior.cancel.cancel();
            }
        }

        *guard = Some(next);
        Ok(())
    }

    fn build_request(&self, request: &TurnRequest) -> ChatRequest {
        ChatRequest {
            user_id: self.defaults.user_id.clone(),
            thread_id: self.defaults.thread_id.clone(),
            message: request.message.trim().to_string(),
            top_k: request.top_k.unwrap_or(self.defaults.top_k).clamp(1, 20),
            save_to_file: request.save_to_file,
            file_name: request.file_name.clone(),
            save_as_document: request
                .save_as_document
                .unwrap_or(self.defaults.save_as_document),
            retrieval_mode: self.defaults.retrieval_mode,
            answer_mode: self.defaults.answer_mode,
            agentic_mode: request.mode == TurnMode::Agentic,
            max_loops: request
                .max_loops
                .unwrap_or(self.defaults.max_loops)
                .clamp(1, 5),
        }
    }
}

// =============================================================================
// Turn task
// =============================================================================

/// Drives one turn to its terminal state and emits its lifecycle events.
async fn run_turn(
    transport: Transport,
    request: ChatRequest,
    id: TurnId,
    mode: TurnMode,
    turn: Arc<Mutex<Turn>>,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<TurnEvent>,
) {
    set_status(&turn, TurnStatus::InFlight);
    let _ = events.send(TurnEvent::TurnStarted {
        turn_id: id,
        mode,
        timestamp: Timestamp::now(),
    });

    let outcome = match mode {
        TurnMode::Streamed => run_streamed(&transport, &request, &cancel, id, &events).await,
        TurnMode::Normal | TurnMode::Agentic => {
            run_buffered(&transport, &request, &cancel).await
        }
    };

    match outcome {
        Ok(answer) => {
            set_status(&turn, TurnStatus::Completed);
            tracing::info!(turn_id = %id, sources = answer.sources.len(), "Turn completed");
            let _ = events.send(TurnEvent::TurnCompleted {
                turn_id: id,
                answer,
                timestamp: Timestamp::now(),
            });
        }
        Err((TurnError::Cancelled, partial)) => {
            set_status(&turn, TurnStatus::Aborted);
            tracing::info!(turn_id = %id, "Turn aborted");
            let _ = events.send(TurnEvent::TurnAborted {
                turn_id: id,
                answer: partial,
                timestamp: Timestamp::now(),
            });
        }
        Err((error, partial)) => {
            set_status(&turn, TurnStatus::Failed);
            tracing::warn!(turn_id = %id, error = %error, "Turn failed");
            let _ = events.send(TurnEvent::TurnFailed {
                turn_id: id,
                error: error.to_string(),
                answer: partial,
                timestamp: Timestamp::now(),
            });
        }
    }
}

/// One request, one response; the assembler consumes it whole.
async fn run_buffered(
    transport: &Transport,
    request: &ChatRequest,
    cancel: &CancellationToken,
) -> Result<AssembledAnswer, (TurnError, AssembledAnswer)> {
    let mut assembler = ResponseAssembler::new();
    match transport.send_chat(request, cancel).await {
        Ok(response) => {
            assembler.apply_final_response(response);
            Ok(assembler.into_answer())
        }
        Err(error) => Err((error, assembler.into_answer())),
    }
}

/// Pulls chunks, parses frames, applies them in arrival order, and emits one
/// progress event per appended delta.
async fn run_streamed(
    transport: &Transport,
    request: &ChatRequest,
    cancel: &CancellationToken,
    id: TurnId,
    events: &mpsc::UnboundedSender<TurnEvent>,
) -> Result<AssembledAnswer, (TurnError, AssembledAnswer)> {
    let mut assembler = ResponseAssembler::new();
    let mut parser = FrameParser::new();

    let mut stream = match transport.open_stream(request, cancel).await {
        Ok(stream) => stream,
        Err(error) => return Err((error, assembler.into_answer())),
    };

    loop {
        let chunk = match stream.next_chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                // End of stream. A trailing unterminated line may still hold
                // the terminal record.
                if let Some(frame) = parser.finish() {
                    match assembler.apply_frame(frame) {
                        FrameOutcome::Finalized => return Ok(assembler.into_answer()),
                        FrameOutcome::Failed(detail) => {
                            return Err((TurnError::Service(detail), assembler.into_answer()))
                        }
                        FrameOutcome::Appended => {}
                    }
                }
                return Err((
                    TurnError::Transport("stream ended before a terminal frame".to_string()),
                    assembler.into_answer(),
                ));
            }
            Err(error) => return Err((error, assembler.into_answer())),
        };

        for frame in parser.feed(&chunk) {
            match assembler.apply_frame(frame) {
                FrameOutcome::Appended => {
                    let _ = events.send(TurnEvent::TurnProgress {
                        turn_id: id,
                        answer: assembler.snapshot(),
                        timestamp: Timestamp::now(),
                    });
                }
                FrameOutcome::Finalized => return Ok(assembler.into_answer()),
                FrameOutcome::Failed(detail) => {
                    return Err((TurnError::Service(detail), assembler.into_answer()))
                }
            }
        }
    }
}

/// Applies a validated status transition, logging rather than panicking on a
/// violation.
fn set_status(turn: &Arc<Mutex<Turn>>, to: TurnStatus) {
    let mut guard = match turn.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Err(e) = guard.transition(to) {
        tracing::error!(error = %e, "Refusing invalid turn transition");
    }
}

// =============================================================================
// Tests
// =============================================================================
