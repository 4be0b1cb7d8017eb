//! Caller-facing notification surface.
//!
//! UI layers implement [`StreamCallbacks`] and override only the
//! notifications they care about; every method defaults to a no-op.
//! Adding a notification here is a compile-visible change for every
//! implementer that wants it, unlike an all-optional options bag.

use async_trait::async_trait;
use serde_json::Value;

use crate::accumulator::ConsultationSummary;

/// Notifications emitted while a consultation runs.
///
/// None of these are guaranteed to fire for any given call; which ones do
/// depends entirely on what the router emits. `on_complete` fires exactly
/// once on success; `on_error` fires before a fatal error is returned, and
/// additionally (without ending the call) when a single agent fails.
#[async_trait]
pub trait StreamCallbacks: Send + Sync {
    /// One token, or one fully-assembled agent response, in arrival order.
    async fn on_token(&self, _text: &str) {}

    /// Fires once, after every chunk has been processed.
    async fn on_complete(&self, _summary: &ConsultationSummary) {}

    /// Fatal call failures, and advisory per-agent failures.
    async fn on_error(&self, _message: &str) {}

    async fn on_citation(&self, _citation: &crate::protocol::Citation) {}

    async fn on_tool_call(&self, _call: &crate::protocol::ToolInvocation) {}

    async fn on_agent_update(&self, _agents: &[String]) {}

    async fn on_plan(&self, _agents: &[String], _complexity: Option<&str>) {}

    async fn on_estimated_time(&self, _seconds: u64) {}

    /// Ticks roughly once a second for the duration of the call.
    async fn on_elapsed_time(&self, _seconds: u64) {}

    /// Escalating reassurance while a slow consultation is still running.
    async fn on_still_working(&self, _note: &str) {}

    async fn on_agent_start(&self, _agent: &str, _index: Option<u32>, _total: Option<u32>) {}

    async fn on_agent_thinking(
        &self,
        _agent: &str,
        _message: Option<&str>,
        _step: Option<u32>,
        _total_steps: Option<u32>,
    ) {
    }

    async fn on_agent_progress(&self, _agent: &str, _status: &str) {}

    async fn on_agent_response(&self, _agent: &str, _text: &str, _structured: Option<&Value>) {}

    async fn on_agent_complete(&self, _agent: &str, _next_agent: Option<&str>) {}

    async fn on_all_agents_complete(&self, _outputs: &Value) {}

    async fn on_question_analysis(&self, _data: &Value) {}

    async fn on_agent_challenge(&self, _data: &Value) {}

    async fn on_agent_revised(&self, _data: &Value) {}

    async fn on_agent_defended(&self, _data: &Value) {}

    async fn on_agent_consensus(&self, _data: &Value) {}

    async fn on_validation_warning(&self, _data: &Value) {}
}

/// Callbacks implementation that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

#[async_trait]
impl StreamCallbacks for NoopCallbacks {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct TokenRecorder {
        tokens: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StreamCallbacks for TokenRecorder {
        async fn on_token(&self, text: &str) {
            self.tokens.lock().unwrap().push(text.to_string());
        }
    }

    #[tokio::test]
    async fn test_partial_impl_overrides_only_what_it_needs() {
        let recorder = TokenRecorder {
            tokens: Mutex::new(Vec::new()),
        };

        recorder.on_token("2.5mm² ").await;
        recorder.on_elapsed_time(3).await;
        recorder.on_agent_start("designer", Some(1), Some(2)).await;

        assert_eq!(*recorder.tokens.lock().unwrap(), vec!["2.5mm² "]);
    }
}
