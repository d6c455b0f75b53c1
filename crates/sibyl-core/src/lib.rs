//! Shared domain model for the Sibyl answering client: turn lifecycle,
//! assembled answers, evidence, lifecycle events, and configuration.

pub mod config;
pub mod error;
pub mod events;
pub mod turn;
pub mod types;

pub use config::SibylConfig;
pub use error::{Result, SibylError};
pub use events::TurnEvent;
pub use turn::{validate_transition, InvalidTransition, Turn, TurnMode, TurnStatus};
pub use types::*;
