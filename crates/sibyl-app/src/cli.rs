//! CLI argument definitions for the Sibyl client.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use sibyl_core::turn::TurnMode;

/// Sibyl: terminal client for a knowledge-base answering service.
#[derive(Parser, Debug)]
#[command(name = "sibyl", version, about)]
pub struct CliArgs {
    /// The question to ask.
    #[arg(required_unless_present = "check_health")]
    pub question: Option<String>,

    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the answering service (overrides the config file).
    #[arg(long = "service-url")]
    pub service_url: Option<String>,

    /// Stream the answer incrementally instead of waiting for the whole
    /// response.
    #[arg(long = "stream", conflicts_with = "agentic")]
    pub stream: bool,

    /// Run the service's multi-pass retrieve/draft/critique loop.
    #[arg(long = "agentic")]
    pub agentic: bool,

    /// Number of fragments to retrieve (1-20).
    #[arg(long = "top-k")]
    pub top_k: Option<u32>,

    /// Maximum service-side loops in agentic mode (1-5).
    #[arg(long = "max-loops")]
    pub max_loops: Option<u32>,

    /// Ask the service to save the answer as a document in the knowledge
    /// base.
    #[arg(long = "save")]
    pub save: bool,

    /// Check service health and exit.
    #[arg(long = "check")]
    pub check_health: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SIBYL_CONFIG env var > ~/.sibyl/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SIBYL_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Transport mode implied by the flags. Fixed for the turn's lifetime.
    pub fn mode(&self) -> TurnMode {
        if self.stream {
            TurnMode::Streamed
        } else if self.agentic {
            TurnMode::Agentic
        } else {
            TurnMode::Normal
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".sibyl").join("config.toml");
    }
    PathBuf::from("config.toml")
}
