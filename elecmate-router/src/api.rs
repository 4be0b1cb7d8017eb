//! Request construction and response classification for the agent router.
//! Builds the consultation body and maps failure statuses onto errors.

use elecmate_core::{Error, Message, Result, CONSULTATION_MODE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// Body of one consultation request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsultRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Content of the most recent user turn
    pub user_message: String,
    pub selected_agents: Vec<String>,
    pub consultation_mode: &'static str,
    /// The full history, forwarded unmodified
    pub messages: Vec<Message>,
    /// The design under discussion, forwarded unmodified
    pub current_design: Value,
}

impl ConsultRequest {
    /// Assembles the request body from the caller's inputs.
    ///
    /// The prompt is the last user message in the history. A target agent
    /// overrides the selection; an absent or empty selection falls back to
    /// the default agent.
    pub fn build(
        messages: &[Message],
        current_design: &Value,
        selected_agents: Option<&[String]>,
        target_agent: Option<&str>,
        default_agent: &str,
    ) -> Result<Self> {
        let prompt = Message::last_user(messages)
            .ok_or_else(|| Error::validation("History contains no user message"))?;

        let selected = match target_agent {
            Some(target) => vec![target.to_string()],
            None => match selected_agents {
                Some(agents) if !agents.is_empty() => agents.to_vec(),
                _ => vec![default_agent.to_string()],
            },
        };

        Ok(Self {
            conversation_id: current_design
                .get("conversationId")
                .and_then(Value::as_str)
                .map(str::to_string),
            user_message: prompt.content.clone(),
            selected_agents: selected,
            consultation_mode: CONSULTATION_MODE,
            messages: messages.to_vec(),
            current_design: current_design.clone(),
        })
    }
}

/// Maps a non-success status and its (already-read) body onto an error.
///
/// 429 and 402 carry fixed user-facing messages. Everything else keeps the
/// status code and a best-effort server message: the body's JSON `error`
/// field, else the raw body text, else the canonical status text.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited,
        StatusCode::PAYMENT_REQUIRED => Error::CreditsExhausted,
        _ => Error::Status {
            status: status.as_u16(),
            message: server_message(body, status.canonical_reason().unwrap_or("request failed")),
        },
    }
}

fn server_message(body: &str, fallback: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(message) = parsed.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
