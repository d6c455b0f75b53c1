use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SibylError};
use crate::types::{AnswerMode, RetrievalMode};

/// Top-level configuration for the Sibyl client.
///
/// Loaded from `~/.sibyl/config.toml` by default. Each section corresponds
/// to one concern: where the answering service lives, and what a turn
/// requests by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SibylConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub turn: TurnConfig,
}

impl Default for SibylConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            turn: TurnConfig::default(),
        }
    }
}

impl SibylConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SibylConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SibylError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Answering service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the answering service.
    pub base_url: String,
    /// Overall request timeout in seconds. `None` waits indefinitely; a
    /// stalled stream then stays open until cancelled or the transport
    /// itself errors.
    pub request_timeout_secs: Option<u64>,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5001".to_string(),
            request_timeout_secs: None,
            connect_timeout_secs: 10,
        }
    }
}

/// Defaults applied to every turn request unless overridden per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// User identity sent with each request.
    pub user_id: String,
    /// Conversation thread identity sent with each request.
    pub thread_id: String,
    /// Number of fragments the service retrieves per question (1..=20).
    pub top_k: u32,
    /// Maximum service-side loops in agentic mode (1..=5).
    pub max_loops: u32,
    /// Retrieval strategy requested from the service.
    pub retrieval_mode: RetrievalMode,
    /// Answer composition strategy requested from the service.
    pub answer_mode: AnswerMode,
    /// Ask the service to persist each answer as a structured document.
    pub save_as_document: bool,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            thread_id: "default".to_string(),
            top_k: 5,
            max_loops: 2,
            retrieval_mode: RetrievalMode::Similarity,
            answer_mode: AnswerMode::Strict,
            save_as_document: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SibylConfig::default();
        assert_eq!(config.service.base_url, "http://127.0.0.1:5001");
        assert!(config.service.request_timeout_secs.is_none());
        assert_eq!(config.turn.top_k, 5);
        assert_eq!(config.turn.max_loops, 2);
        assert_eq!(config.turn.retrieval_mode, RetrievalMode::Similarity);
        assert_eq!(config.turn.answer_mode, AnswerMode::Strict);
        assert!(!config.turn.save_as_document);
    }

    #[test]
    fn test_load_missing_file_falls_back_to_default() {
        let config = SibylConfig::load_or_default(Path::new("/nonexistent/sibyl.toml"));
        assert_eq!(config.service.base_url, "http://127.0.0.1:5001");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_str = r#"
            [service]
            base_url = "http://10.0.0.2:9000"
        "#;
        let config: SibylConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.service.base_url, "http://10.0.0.2:9000");
        // Unspecified sections and fields keep defaults.
        assert_eq!(config.service.connect_timeout_secs, 10);
        assert_eq!(config.turn.top_k, 5);
    }

    #[test]
    fn test_timeout_knob_parses() {
        let toml_str = r#"
            [service]
            request_timeout_secs = 120
        "#;
        let config: SibylConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.service.request_timeout_secs, Some(120));
    }

    #[test]
    fn test_turn_modes_parse_by_wire_name() {
        let toml_str = r#"
            [turn]
            retrieval_mode = "mmr"
            answer_mode = "balanced"
        "#;
        let config: SibylConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.turn.retrieval_mode, RetrievalMode::Mmr);
        assert_eq!(config.turn.answer_mode, AnswerMode::Balanced);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = SibylConfig::default();
        config.service.base_url = "http://192.168.1.5:5001".to_string();
        config.turn.top_k = 8;
        config.save(&path).unwrap();

        let reloaded = SibylConfig::load(&path).unwrap();
        assert_eq!(reloaded.service.base_url, "http://192.168.1.5:5001");
        assert_eq!(reloaded.turn.top_k, 8);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("config.toml");
        SibylConfig::default().save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "service = [[[").unwrap();
        assert!(SibylConfig::load(&path).is_err());
    }
}
