//! Display policy for assembled answers.
//!
//! Maps a confidence label plus evidence onto what the presentation layer
//! should show: the badge, the low-confidence advisory block, citation
//! affordances, and the reasoning panel. Pure function of the answer.

use sibyl_core::types::{AssembledAnswer, ConfidenceLevel, StepKind};

/// What the presentation layer should render for one assembled answer.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayPolicy {
    /// Confidence badge to show next to the answer.
    pub badge: ConfidenceLevel,
    /// Render the low-confidence advisory block. Always true for `low`,
    /// with or without sources.
    pub show_disclaimer: bool,
    /// Citations render only when there is evidence to cite.
    pub citations_visible: bool,
    /// Must equal the number of sources exactly; the label showing it is
    /// derived from the same value.
    pub evidence_count: usize,
    /// Retrieval passes to show in the reasoning panel; `None` renders no
    /// panel at all.
    pub reasoning_loops: Option<usize>,
}

/// Decides the display policy for an assembled answer.
pub fn decide(answer: &AssembledAnswer) -> DisplayPolicy {
    let reasoning_loops = if answer.reasoning_trace.is_empty() {
        None
    } else {
        // One retrieval pass per service-side loop. The service's own count
        // wins when it reported one.
        let derived = answer
            .reasoning_trace
            .iter()
            .filter(|step| step.kind == StepKind::Retrieve)
            .count();
        Some(answer.loops_used.map(|n| n as usize).unwrap_or(derived))
    };

    DisplayPolicy {
        badge: answer.confidence,
        show_disclaimer: answer.confidence == ConfidenceLevel::Low,
        citations_visible: !answer.sources.is_empty(),
        evidence_count: answer.sources.len(),
        reasoning_loops,
    }
}

// =============================================================================
// Tests
// =============================================================================
