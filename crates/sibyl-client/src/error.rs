//! Error types for a single turn.

use sibyl_core::error::SibylError;

/// Errors from conducting one turn against the answering service.
///
/// Malformed stream frames are not represented here: they are logged and
/// skipped by the frame parser, never failing the turn.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("knowledge base is empty; upload and index documents first")]
    EmptyKnowledgeBase,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("service error: {0}")]
    Service(String),
    #[error("turn cancelled")]
    Cancelled,
    #[error("internal state error: {0}")]
    Internal(String),
}

impl TurnError {
    /// True for the pre-network rejections that never issue a request.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, TurnError::EmptyMessage | TurnError::EmptyKnowledgeBase)
    }
}

impl From<TurnError> for SibylError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::Transport(msg) => SibylError::Transport(msg),
            TurnError::Service(msg) => SibylError::Service(msg),
            other => SibylError::Turn(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_error_display() {
        let err = TurnError::EmptyMessage;
        assert_eq!(err.to_string(), "message cannot be empty");

        let err = TurnError::EmptyKnowledgeBase;
        assert_eq!(
            err.to_string(),
            "knowledge base is empty; upload and index documents first"
        );

        let err = TurnError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "transport error: connection refused");

        let err = TurnError::Service("vector store offline".to_string());
        assert_eq!(err.to_string(), "service error: vector store offline");

        let err = TurnError::Cancelled;
        assert_eq!(err.to_string(), "turn cancelled");
    }

    #[test]
    fn test_invalid_input_classification() {
        assert!(TurnError::EmptyMessage.is_invalid_input());
        assert!(TurnError::EmptyKnowledgeBase.is_invalid_input());
        assert!(!TurnError::Transport("x".to_string()).is_invalid_input());
        assert!(!TurnError::Service("x".to_string()).is_invalid_input());
        assert!(!TurnError::Cancelled.is_invalid_input());
    }

    #[test]
    fn test_conversion_to_sibyl_error() {
        let err: SibylError = TurnError::Transport("timeout".to_string()).into();
        assert!(matches!(err, SibylError::Transport(_)));

        let err: SibylError = TurnError::Service("boom".to_string()).into();
        assert!(matches!(err, SibylError::Service(_)));

        let err: SibylError = TurnError::Cancelled.into();
        assert!(matches!(err, SibylError::Turn(_)));
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn test_empty_inner_messages() {
        let err = TurnError::Transport(String::new());
        assert_eq!(err.to_string(), "transport error: ");

        let err = TurnError::Service(String::new());
        assert_eq!(err.to_string(), "service error: ");
    }

    #[test]
    fn test_errors_implement_debug() {
        let dbg = format!("{:?}", TurnError::EmptyMessage);
        assert!(dbg.contains("EmptyMessage"));

        let dbg = format!("{:?}", TurnError::Transport("x".to_string()));
        assert!(dbg.contains("Transport"));
    }
}
