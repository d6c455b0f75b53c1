//! Sibyl application binary - composition root.
//!
//! Ties the client crates together into a terminal front end:
//! 1. Load configuration from TOML
//! 2. Probe service health (knowledge-base gate signal)
//! 3. Start one turn in the requested transport mode
//! 4. Render lifecycle events and the final display policy
//!
//! Ctrl-C cancels the in-flight turn cooperatively; the partial answer is
//! rendered as "stopped" rather than discarded.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;

use sibyl_client::policy::decide;
use sibyl_client::session::{SessionController, TurnRequest};
use sibyl_client::transport::Transport;
use sibyl_core::config::SibylConfig;
use sibyl_core::events::TurnEvent;
use sibyl_core::types::AssembledAnswer;

mod cli;
use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing.
    let default_filter = args.log_level.clone().unwrap_or_else(|| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = SibylConfig::load_or_default(&config_file);
    if let Some(url) = args.service_url.clone() {
        config.service.base_url = url;
    }
    tracing::info!(path = %config_file.display(), service = %config.service.base_url, "Configuration loaded");

    let transport = Transport::new(&config.service)?;

    // Health probe: gate signal for the controller, and the --check output.
    let health = transport.health().await;
    if args.check_health {
        return match health {
            Ok(status) => {
                println!(
                    "service: {} | vector store ready: {} | documents indexed: {}",
                    status.status, status.vectorstore_ready, status.doc_count
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        };
    }

    let controller = Arc::new(SessionController::new(transport, config.turn.clone()));
    match health {
        Ok(status) => controller.update_document_count(status.doc_count),
        Err(e) => tracing::warn!(error = %e, "Health probe failed; proceeding without gate signal"),
    }

    // Cooperative Ctrl-C: first press cancels the turn, the task exits with
    // the abort event.
    let canceller = Arc::clone(&controller);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel_current();
        }
    });

    let question = args.question.clone().unwrap_or_default();
    let request = TurnRequest {
        message: question,
        mode: args.mode(),
        top_k: args.top_k,
        max_loops: args.max_loops,
        save_to_file: false,
        file_name: None,
        save_as_document: if args.save { Some(true) } else { None },
    };

    let mut handle = controller.start_turn(request)?;

    let mut printed = 0usize;
    while let Some(event) = handle.next_event().await {
        match event {
            TurnEvent::TurnStarted { mode, .. } => {
                tracing::info!(mode = ?mode, "Waiting for the service");
            }
            TurnEvent::TurnProgress { answer, .. } => {
                // Snapshots carry the whole text; print only the new tail.
                if answer.text.len() > printed {
                    print!("{}", &answer.text[printed..]);
                    std::io::stdout().flush().ok();
                    printed = answer.text.len();
                }
            }
            TurnEvent::TurnCompleted { answer, .. } => {
                if printed == 0 {
                    println!("{}", answer.text);
                } else {
                    // Remainder, if the terminal record replayed more text
                    // than the deltas delivered.
                    if answer.text.len() > printed {
                        print!("{}", &answer.text[printed..]);
                    }
                    println!();
                }
                render_details(&answer);
            }
            TurnEvent::TurnAborted { answer, .. } => {
                if printed > 0 {
                    println!();
                }
                if answer.has_text() {
                    println!("[stopped; partial answer above]");
                } else {
                    println!("[stopped]");
                }
            }
            TurnEvent::TurnFailed { error, answer, .. } => {
                if printed > 0 {
                    println!();
                    println!("[failed before completion; partial answer above]");
                } else if answer.has_text() {
                    println!("{}", answer.text);
                    println!("[failed before completion; partial answer above]");
                }
                return Err(error.into());
            }
            other => {
                tracing::debug!(event = other.event_name(), "Ignoring lifecycle event");
            }
        }
    }

    Ok(())
}

/// Renders the evidence, confidence, and reasoning affordances for a
/// completed answer.
fn render_details(answer: &AssembledAnswer) {
    let policy = decide(answer);

    if policy.show_disclaimer {
        println!();
        println!("[low confidence] The knowledge base may not contain enough");
        println!("evidence for this answer; consider uploading more material.");
    }

    if policy.citations_visible {
        println!();
        println!("Sources ({}):", policy.evidence_count);
        for source in &answer.sources {
            println!(
                "  - {} [{}] score {:.3}",
                source.origin, source.fragment_id, source.relevance_score
            );
        }
    }

    if let Some(loops) = policy.reasoning_loops {
        println!();
        println!("Reasoning: {} retrieval pass(es)", loops);
        for step in &answer.reasoning_trace {
            match &step.detail {
                Some(detail) => println!("  {:?}: {}", step.kind, detail),
                None => println!("  {:?}", step.kind),
            }
        }
    }

    if let Some(artifact) = &answer.persistence {
        println!();
        println!("Saved to {}", artifact.path);
    }

    println!();
    println!("confidence: {}", policy.badge.label());
}
