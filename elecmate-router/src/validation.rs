//! Request validation run before any network traffic.

use elecmate_core::{Error, Message, Result, KNOWN_AGENTS};
use tracing::warn;

/// Checks that a history can actually be consulted on: it must be
/// non-empty and its most recent user turn must have content.
pub fn validate_history(messages: &[Message]) -> Result<()> {
    if messages.is_empty() {
        return Err(Error::validation("Conversation history is empty"));
    }

    let prompt = Message::last_user(messages)
        .ok_or_else(|| Error::validation("History contains no user message"))?;

    if prompt.content.trim().is_empty() {
        return Err(Error::validation("User message is blank"));
    }

    Ok(())
}

/// Logs agent names the router is not known to route to. The router stays
/// authoritative, so this never fails the request.
pub fn check_agents(agents: &[String]) {
    for agent in agents {
        if !KNOWN_AGENTS.contains(&agent.as_str()) {
            warn!("unrecognised agent '{}' forwarded to router", agent);
        }
    }
}
