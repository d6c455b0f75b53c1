use serde::Serialize;

use crate::turn::TurnMode;
use crate::types::{AssembledAnswer, Timestamp, TurnId};

/// Lifecycle notifications emitted for one turn, in order: `turn_started`,
/// zero or more `turn_progress` (streamed mode only), then exactly one
/// terminal event.
///
/// Events are consumed by:
/// - The presentation layer (incremental rendering)
/// - The event log (for audit/debugging)
#[derive(Clone, Debug, Serialize)]
#[non_exhaustive]
pub enum TurnEvent {
    /// The turn was accepted and its exchange is being issued.
    TurnStarted {
        turn_id: TurnId,
        mode: TurnMode,
        timestamp: Timestamp,
    },

    /// A delta was applied to the accumulating answer (streamed mode only).
    /// Carries a snapshot of the answer so far.
    TurnProgress {
        turn_id: TurnId,
        answer: AssembledAnswer,
        timestamp: Timestamp,
    },

    /// The turn finished with a fully assembled answer.
    TurnCompleted {
        turn_id: TurnId,
        answer: AssembledAnswer,
        timestamp: Timestamp,
    },

    /// The turn was cancelled by the user. Carries whatever partial answer
    /// had accumulated; rendered as "stopped", not as a failure.
    TurnAborted {
        turn_id: TurnId,
        answer: AssembledAnswer,
        timestamp: Timestamp,
    },

    /// The turn failed. Partial answer text is preserved for display.
    TurnFailed {
        turn_id: TurnId,
        error: String,
        answer: AssembledAnswer,
        timestamp: Timestamp,
    },
}

impl TurnEvent {
    /// Returns the id of the turn this event belongs to.
    pub fn turn_id(&self) -> TurnId {
        match self {
            TurnEvent::TurnStarted { turn_id, .. }
            | TurnEvent::TurnProgress { turn_id, .. }
            | TurnEvent::TurnCompleted { turn_id, .. }
            | TurnEvent::TurnAborted { turn_id, .. }
            | TurnEvent::TurnFailed { turn_id, .. } => *turn_id,
        }
    }

    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            TurnEvent::TurnStarted { timestamp, .. }
            | TurnEvent::TurnProgress { timestamp, .. }
            | TurnEvent::TurnCompleted { timestamp, .. }
            | TurnEvent::TurnAborted { timestamp, .. }
            | TurnEvent::TurnFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a human-readable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            TurnEvent::TurnStarted { .. } => "turn_started",
            TurnEvent::TurnProgress { .. } => "turn_progress",
            TurnEvent::TurnCompleted { .. } => "turn_completed",
            TurnEvent::TurnAborted { .. } => "turn_aborted",
            TurnEvent::TurnFailed { .. } => "turn_failed",
        }
    }

    /// True for the exactly-once terminal events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnEvent::TurnCompleted { .. }
                | TurnEvent::TurnAborted { .. }
                | TurnEvent::TurnFailed { .. }
        )
    }
}
