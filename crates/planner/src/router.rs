//! Decides whether the latest user turn is a planning request or a hand-off.
use tracing::debug;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;

/// Phrase that routes a request to the implementation side, matched case-insensitively
pub const DELEGATION_TRIGGER: &str = "implement milestone";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Delegate,
    Plan,
}

/// Return the latest message, which must be user-authored.
pub fn latest_user_message(history: &[Message]) -> AgentResult<&Message> {
    let latest = history
        .last()
        .ok_or_else(|| AgentError::InvalidHistory("history is empty".to_string()))?;

    if !latest.is_user() {
        return Err(AgentError::InvalidHistory(format!(
            "latest message must come from the user, found {}",
            latest.role
        )));
    }
    Ok(latest)
}

/// Classify the latest user message without contacting the model.
pub fn route(history: &[Message]) -> AgentResult<Intent> {
    let latest = latest_user_message(history)?;
    let intent = if latest.content.to_lowercase().contains(DELEGATION_TRIGGER) {
        Intent::Delegate
    } else {
        Intent::Plan
    };
    debug!(?intent, "routed latest user message");
    Ok(intent)
}
