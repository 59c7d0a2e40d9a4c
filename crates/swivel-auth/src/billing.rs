//! Billing-failure detection over agent-run outcomes, plus the filter that
//! keeps raw billing-error messages away from chat surfaces.

use serde::{Deserialize, Serialize};

/// Marker substrings that classify a failed run as billing-related.
/// Matching is case-insensitive containment; an unrelated error that happens
/// to contain one of these still rotates.
const BILLING_ERROR_MARKERS: [&str; 5] =
    ["billing", "credit", "insufficient", "balance", "run out"];

/// Both phrases must appear before an outgoing message is suppressed.
const SUPPRESS_MARKERS: [&str; 2] = ["billing error", "run out of credits"];

/// Outcome of one agent run as delivered by the host's event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentRunOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// True when a failed run's error text names one of the billing markers.
/// Successful runs and runs without error text never match.
pub fn is_billing_failure(outcome: &AgentRunOutcome) -> bool {
    if outcome.success {
        return false;
    }
    let Some(error) = outcome.error.as_deref().filter(|text| !text.is_empty()) else {
        return false;
    };
    let lowered = error.to_lowercase();
    BILLING_ERROR_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Decision for an outgoing chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageVerdict {
    Deliver,
    Suppress,
}

/// Suppresses outgoing messages carrying the full billing-error payload.
/// Both marker phrases must appear, case-insensitively; anything less is
/// delivered untouched.
pub fn review_outgoing_message(content: &str) -> MessageVerdict {
    let lowered = content.to_lowercase();
    if SUPPRESS_MARKERS
        .iter()
        .all(|marker| lowered.contains(marker))
    {
        tracing::info!("suppressed billing error message to user");
        MessageVerdict::Suppress
    } else {
        MessageVerdict::Deliver
    }
}
