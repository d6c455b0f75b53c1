//! Turn lifecycle state machine with validated transitions.
//!
//! A turn moves `Pending -> InFlight -> {Completed | Aborted | Failed}`.
//! Terminal states are final; no transition leaves them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Timestamp, TurnId};

/// Transport mode for a turn, chosen once at turn start and immutable for
/// the turn's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    /// One request, one JSON response.
    #[default]
    Normal,
    /// One request, incrementally streamed frames.
    Streamed,
    /// One request, one JSON response produced by the service's multi-pass
    /// retrieve/draft/critique loop.
    Agentic,
}

/// Lifecycle status of a turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    #[default]
    Pending,
    InFlight,
    Completed,
    Aborted,
    Failed,
}

impl TurnStatus {
    /// Terminal states absorb: once reached, no further transition is valid.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnStatus::Completed | TurnStatus::Aborted | TurnStatus::Failed
        )
    }
}

impl std::fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnStatus::Pending => "pending",
            TurnStatus::InFlight => "in_flight",
            TurnStatus::Completed => "completed",
            TurnStatus::Aborted => "aborted",
            TurnStatus::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Error raised on an invalid status transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid turn transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: TurnStatus,
    pub to: TurnStatus,
}

/// Validate that a status transition is allowed.
///
/// Valid transitions:
/// - Pending -> InFlight
/// - InFlight -> Completed
/// - InFlight -> Aborted
/// - InFlight -> Failed
pub fn validate_transition(from: TurnStatus, to: TurnStatus) -> Result<(), InvalidTransition> {
    let valid = matches!(
        (from, to),
        (TurnStatus::Pending, TurnStatus::InFlight)
            | (TurnStatus::InFlight, TurnStatus::Completed)
            | (TurnStatus::InFlight, TurnStatus::Aborted)
            | (TurnStatus::InFlight, TurnStatus::Failed)
    );

    if valid {
        Ok(())
    } else {
        Err(InvalidTransition { from, to })
    }
}

/// One question/answer exchange between client and service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub mode: TurnMode,
    pub status: TurnStatus,
    pub started_at: Timestamp,
}

impl Turn {
    /// Create a pending turn with a fresh client-side id.
    pub fn new(mode: TurnMode) -> Self {
        Self {
            id: TurnId::new(),
            mode,
            status: TurnStatus::Pending,
            started_at: Timestamp::now(),
        }
    }

    /// Apply a validated status transition.
    pub fn transition(&mut self, to: TurnStatus) -> Result<(), InvalidTransition> {
        validate_transition(self.status, to)?;
        self.status = to;
        Ok(())
    }
}
