//! Call-local accumulation of one consultation's output.

use serde::Serialize;
use serde_json::Value;

use crate::protocol::{Citation, ToolInvocation};

/// Mutable state collecting text, citations, tool calls and structured data
/// across all chunks of one exchange. Created when a consultation starts,
/// handed to the caller as a [`ConsultationSummary`] when it completes.
#[derive(Debug, Default)]
pub struct Accumulator {
    response: String,
    citations: Vec<Citation>,
    tool_calls: Vec<ToolInvocation>,
    active_agents: Vec<String>,
    structured_data: Option<Value>,
    suggested_next_agents: Vec<String>,
    consulted_agents: Vec<String>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends text exactly as received.
    pub fn push_text(&mut self, text: &str) {
        self.response.push_str(text);
    }

    /// Appends a block of text, separating it from earlier content with a
    /// blank line.
    pub fn push_block(&mut self, text: &str) {
        if !self.response.is_empty() {
            self.response.push_str("\n\n");
        }
        self.response.push_str(text);
    }

    /// Citations keep arrival order and are never deduplicated.
    pub fn push_citation(&mut self, citation: Citation) {
        self.citations.push(citation);
    }

    pub fn push_tool_call(&mut self, call: ToolInvocation) {
        self.tool_calls.push(call);
    }

    /// Replaces the active agent set wholesale; plans and agent updates are
    /// not merged with earlier ones.
    pub fn set_active_agents(&mut self, agents: Vec<String>) {
        self.active_agents = agents;
    }

    /// Last write wins; earlier structured payloads are not retained.
    pub fn set_structured_data(&mut self, data: Value) {
        self.structured_data = Some(data);
    }

    pub fn set_routing(&mut self, suggested: Vec<String>, consulted: Vec<String>) {
        self.suggested_next_agents = suggested;
        self.consulted_agents = consulted;
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn finish(self) -> ConsultationSummary {
        ConsultationSummary {
            response: self.response,
            citations: self.citations,
            tool_calls: self.tool_calls,
            agents: self.active_agents,
            structured_data: self.structured_data,
            suggested_next_agents: self.suggested_next_agents,
            consulted_agents: self.consulted_agents,
        }
    }
}

/// Everything one consultation produced.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConsultationSummary {
    pub response: String,
    pub citations: Vec<Citation>,
    pub tool_calls: Vec<ToolInvocation>,
    pub agents: Vec<String>,
    pub structured_data: Option<Value>,
    pub suggested_next_agents: Vec<String>,
    pub consulted_agents: Vec<String>,
}
