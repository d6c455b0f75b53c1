use thiserror::Error;

/// Top-level error type for the Sibyl client.
///
/// Each variant wraps a subsystem-specific failure. The `sibyl-client` crate
/// defines its own turn-scoped error type and converts into `SibylError` at
/// the binary boundary so the `?` operator works across crates.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SibylError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Turn error: {0}")]
    Turn(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for SibylError {
    fn from(err: toml::de::Error) -> Self {
        SibylError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SibylError {
    fn from(err: toml::ser::Error) -> Self {
        SibylError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SibylError {
    fn from(err: serde_json::Error) -> Self {
        SibylError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Sibyl operations.
pub type Result<T> = std::result::Result<T, SibylError>;
