//! Protocol types module containing the chat message and response bodies.
//!
//! These types mirror the agent router's wire format: camelCase field
//! names, optional fields omitted entirely when absent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Consultation mode sent with every request. The router also supports an
/// orchestrated mode where it picks the agent order itself; this client
/// always drives the selection from the caller's side.
pub const CONSULTATION_MODE: &str = "user-driven";

/// The agent consulted when the caller does not pick any.
pub const DEFAULT_AGENT: &str = "designer";

/// Agent identifiers the router currently routes to. The router remains
/// authoritative; unknown names are forwarded and only logged here.
pub const KNOWN_AGENTS: &[&str] = &[
    "designer",
    "installer",
    "health-safety",
    "commissioning",
    "cost-engineer",
];

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A regulation or guidance citation attached to agent output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Where the citation comes from, e.g. "BS 7671:2018+A2:2022"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Clause or regulation number, e.g. "411.3.3"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Quoted or paraphrased text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A tool invocation reported by an agent mid-consultation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// One message of the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolInvocation>>,
    /// Agents that contributed to an assistant message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<String>>,
    /// Single agent attribution, when only one answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl Message {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            citations: None,
            tool_calls: None,
            agents: None,
            agent: None,
        }
    }

    /// Creates a plain assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            citations: None,
            tool_calls: None,
            agents: None,
            agent: None,
        }
    }

    /// Finds the most recent user message in a history. The prompt sent to
    /// the router is always the last *user* turn, which is not necessarily
    /// the last element of the history.
    pub fn last_user(messages: &[Message]) -> Option<&Message> {
        messages.iter().rev().find(|m| m.role == Role::User)
    }
}

/// One agent's entry in a non-streaming router response.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentReply {
    pub agent: String,
    /// Either plain text or a JSON document; some router deployments send
    /// the latter serialized as a string.
    pub response: Value,
    #[serde(default)]
    pub structured_data: Option<Value>,
}

impl AgentReply {
    /// Extracts the display text and the structured payload from the reply,
    /// unwrapping the stringified-JSON form where necessary.
    pub fn extract(&self) -> (String, Option<Value>) {
        let mut structured = self.structured_data.clone();

        let text = match &self.response {
            Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.starts_with('{') {
                    match serde_json::from_str::<Value>(trimmed) {
                        Ok(parsed) => {
                            if structured.is_none() {
                                structured = parsed.get("structuredData").cloned();
                            }
                            Self::text_of(&parsed).unwrap_or_else(|| raw.clone())
                        }
                        Err(_) => raw.clone(),
                    }
                } else {
                    raw.clone()
                }
            }
            Value::Object(_) => {
                if structured.is_none() {
                    structured = self.response.get("structuredData").cloned();
                }
                Self::text_of(&self.response).unwrap_or_else(|| self.response.to_string())
            }
            other => other.to_string(),
        };

        (text, structured)
    }

    fn text_of(value: &Value) -> Option<String> {
        for key in ["response", "text", "content"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return Some(text.to_string());
            }
        }
        None
    }
}

/// Body of a non-streaming (plain JSON) router response.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouterResponse {
    pub success: bool,
    #[serde(default)]
    pub responses: Option<Vec<AgentReply>>,
    #[serde(default)]
    pub suggested_next_agents: Vec<String>,
    #[serde(default)]
    pub consulted_agents: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}
