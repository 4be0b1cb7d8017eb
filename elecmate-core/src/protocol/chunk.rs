//! Stream chunk definitions.
//!
//! Every event on the consultation stream is a JSON object tagged by a
//! `type` field. Exactly one variant applies per chunk; fields that do not
//! belong to the tag are absent on the wire, never defaulted.

use serde::Deserialize;
use serde_json::Value;

use super::types::{Citation, ToolInvocation};

/// One event of the consultation stream.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Incremental text from the currently responding agent
    Token { content: String },

    /// A regulation/guidance citation
    Citation { citation: Citation },

    /// A tool the responding agent invoked
    ToolCall {
        #[serde(rename = "toolCall")]
        tool_call: ToolInvocation,
    },

    /// Replacement set of agents participating in this consultation
    AgentUpdate { agents: Vec<String> },

    /// The router's up-front plan for the consultation
    Plan {
        agents: Vec<String>,
        #[serde(default)]
        complexity: Option<String>,
    },

    /// Router estimate of how long the consultation will take
    EstimatedTime { seconds: u64 },

    /// The router's analysis of the user's question
    QuestionAnalysis { data: Value },

    /// A named agent began producing its part of the response
    AgentStart {
        agent: String,
        #[serde(default)]
        index: Option<u32>,
        #[serde(default)]
        total: Option<u32>,
    },

    /// Progress narration while an agent works through its steps
    AgentThinking {
        agent: String,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        step: Option<u32>,
        #[serde(default, rename = "totalSteps")]
        total_steps: Option<u32>,
    },

    /// Coarse per-agent status line
    AgentProgress { agent: String, status: String },

    /// A fully-assembled agent response, optionally with machine-readable
    /// output attached
    AgentResponse {
        agent: String,
        response: String,
        #[serde(default, rename = "structuredData")]
        structured_data: Option<Value>,
    },

    /// An agent finished; the router may already know who runs next
    AgentComplete {
        agent: String,
        #[serde(default, rename = "nextAgent")]
        next_agent: Option<String>,
    },

    /// A named agent failed. Non-fatal: the rest of the consultation
    /// continues.
    AgentError { agent: String, error: String },

    /// A named agent was skipped by the router. Non-fatal.
    AgentSkipped {
        agent: String,
        #[serde(default)]
        reason: Option<String>,
    },

    /// All agents have produced output
    AllAgentsComplete { outputs: Value },

    // Inter-agent debate protocol: one agent challenges another's output,
    // which is then revised or defended until consensus.
    AgentChallenge { data: Value },
    AgentRevised { data: Value },
    AgentDefended { data: Value },
    AgentConsensus { data: Value },

    /// The router flagged a compliance concern in the combined output
    ValidationWarning { data: Value },

    /// Fatal router-side failure; ends the consultation
    Error {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },

    /// Final routing metadata. Does not terminate the stream by itself;
    /// the transport closing does.
    Done {
        #[serde(default, rename = "suggestedNextAgents")]
        suggested_next_agents: Option<Vec<String>>,
        #[serde(default, rename = "consultedAgents")]
        consulted_agents: Option<Vec<String>>,
    },

    /// Any tag this client does not recognise
    #[serde(other)]
    Unknown,
}

impl StreamChunk {
    /// The message carried by a fatal `error` chunk.
    pub fn error_message(error: Option<String>, message: Option<String>) -> String {
        error
            .or(message)
            .unwrap_or_else(|| "consultation failed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> StreamChunk {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_token_chunk() {
        let chunk = parse(json!({"type": "token", "content": "32A "}));
        assert_eq!(
            chunk,
            StreamChunk::Token {
                content: "32A ".into()
            }
        );
    }

    #[test]
    fn test_agent_response_chunk() {
        let chunk = parse(json!({
            "type": "agent_response",
            "agent": "designer",
            "response": "Ring final circuit, 2.5mm.",
            "structuredData": {"circuits": [{"ref": "C1"}]}
        }));

        match chunk {
            StreamChunk::AgentResponse {
                agent,
                response,
                structured_data,
            } => {
                assert_eq!(agent, "designer");
                assert!(response.contains("Ring final"));
                assert!(structured_data.is_some());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_agent_start_optional_fields() {
        let chunk = parse(json!({"type": "agent_start", "agent": "installer"}));
        assert_eq!(
            chunk,
            StreamChunk::AgentStart {
                agent: "installer".into(),
                index: None,
                total: None
            }
        );
    }

    #[test]
    fn test_debate_chunks() {
        let chunk = parse(json!({
            "type": "agent_challenge",
            "data": {"challenger": "health-safety", "target": "designer"}
        }));
        assert!(matches!(chunk, StreamChunk::AgentChallenge { .. }));
    }

    #[test]
    fn test_unknown_tag_is_tolerated() {
        let chunk = parse(json!({"type": "telemetry_v2", "payload": 42}));
        assert_eq!(chunk, StreamChunk::Unknown);
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(
            StreamChunk::error_message(Some("a".into()), Some("b".into())),
            "a"
        );
        assert_eq!(StreamChunk::error_message(None, Some("b".into())), "b");
        assert_eq!(StreamChunk::error_message(None, None), "consultation failed");
    }
}
