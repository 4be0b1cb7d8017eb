//! The consultation exchange.
//!
//! One call to [`RouterClient::stream_consultation`] performs one request
//! and settles exactly one way: `on_complete` with the accumulated result,
//! or `on_error` followed by the error. The router answers either with a
//! live `text/event-stream` or with a single JSON document; both shapes
//! are normalized into the same chunk dispatch so callers observe the
//! same incremental behaviour regardless.

use elecmate_core::{
    Accumulator, ConsultationSummary, Error, Message, Result, RouterResponse, SseDecoder,
    StreamCallbacks, StreamChunk,
};
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::client::RouterClient;
use crate::validation;
use crate::watchdog::{Watchdog, WatchdogEvent};

const SSE_CONTENT_TYPE: &str = "text/event-stream";

impl RouterClient {
    /// Runs one consultation against the router.
    ///
    /// `messages` is the full conversation history; the most recent user
    /// turn becomes the prompt. `current_design` is forwarded verbatim and
    /// only mined for a `conversationId`. With no `selected_agents` the
    /// default agent is consulted; `target_agent` overrides the selection
    /// entirely.
    ///
    /// Progress is reported through `callbacks` as chunks arrive. Partial
    /// output already delivered through `on_token` is never rolled back,
    /// even when the call later fails.
    pub async fn stream_consultation<C: StreamCallbacks>(
        &self,
        messages: &[Message],
        current_design: &Value,
        selected_agents: Option<&[String]>,
        target_agent: Option<&str>,
        callbacks: &C,
    ) -> Result<ConsultationSummary> {
        let prepared = validation::validate_history(messages).and_then(|_| {
            crate::api::ConsultRequest::build(
                messages,
                current_design,
                selected_agents,
                target_agent,
                &self.config.default_agent,
            )
        });
        let request = match prepared {
            Ok(request) => request,
            Err(err) => {
                callbacks.on_error(&err.to_string()).await;
                return Err(err);
            }
        };
        validation::check_agents(&request.selected_agents);

        let _guard = self.engage_streaming();
        let started = Instant::now();
        let mut watchdog = Watchdog::start(self.config.watchdog.clone());

        info!("consulting agents {:?}", request.selected_agents);
        let outcome = self.run_exchange(&request, &mut watchdog, callbacks).await;
        drop(watchdog);

        match outcome {
            Ok(summary) => {
                self.metrics.record_success(started.elapsed()).await;
                callbacks.on_complete(&summary).await;
                Ok(summary)
            }
            Err(err) => {
                self.metrics.record_failure(started.elapsed()).await;
                callbacks.on_error(&err.to_string()).await;
                Err(err)
            }
        }
    }

    async fn run_exchange<C: StreamCallbacks>(
        &self,
        request: &crate::api::ConsultRequest,
        watchdog: &mut Watchdog,
        callbacks: &C,
    ) -> Result<ConsultationSummary> {
        let mut accumulator = Accumulator::new();

        let send = self.send(request);
        tokio::pin!(send);
        let response = loop {
            tokio::select! {
                event = watchdog.next() => Self::relay_watchdog(event, callbacks).await?,
                outcome = &mut send => break outcome?,
            }
        };

        if is_event_stream(&response) {
            self.read_sse(response, watchdog, callbacks, &mut accumulator)
                .await?;
        } else {
            self.read_json(response, watchdog, callbacks, &mut accumulator)
                .await?;
        }

        Ok(accumulator.finish())
    }

    /// Routes one watchdog event to the UI. The hard deadline becomes the
    /// call's failure; everything else is informational.
    async fn relay_watchdog<C: StreamCallbacks>(
        event: WatchdogEvent,
        callbacks: &C,
    ) -> Result<()> {
        match event {
            WatchdogEvent::Tick(seconds) => callbacks.on_elapsed_time(seconds).await,
            WatchdogEvent::StillWorking(note) => {
                warn!("slow consultation: {}", note);
                callbacks.on_still_working(&note).await;
            }
            WatchdogEvent::TimedOut => return Err(Error::Timeout),
        }
        Ok(())
    }

    async fn read_sse<C: StreamCallbacks>(
        &self,
        response: Response,
        watchdog: &mut Watchdog,
        callbacks: &C,
        accumulator: &mut Accumulator,
    ) -> Result<()> {
        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();

        loop {
            tokio::select! {
                event = watchdog.next() => Self::relay_watchdog(event, callbacks).await?,
                read = body.next() => match read {
                    Some(Ok(bytes)) => {
                        for chunk in decoder.feed(&bytes) {
                            self.dispatch(chunk, callbacks, accumulator).await?;
                        }
                    }
                    Some(Err(err)) => {
                        error!("response stream failed: {}", err);
                        return Err(Error::stream(err.to_string()));
                    }
                    None => {
                        for chunk in decoder.finish() {
                            self.dispatch(chunk, callbacks, accumulator).await?;
                        }
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Handles the plain-JSON response shape some router deployments send
    /// when they cannot stream.
    async fn read_json<C: StreamCallbacks>(
        &self,
        response: Response,
        watchdog: &mut Watchdog,
        callbacks: &C,
        accumulator: &mut Accumulator,
    ) -> Result<()> {
        let parse = response.json::<RouterResponse>();
        tokio::pin!(parse);
        let body = loop {
            tokio::select! {
                event = watchdog.next() => Self::relay_watchdog(event, callbacks).await?,
                parsed = &mut parse => {
                    break parsed
                        .map_err(|err| Error::protocol(format!("malformed router response: {err}")))?;
                }
            }
        };

        if !body.success {
            return Err(Error::Protocol(
                body.error
                    .unwrap_or_else(|| "router reported failure".to_string()),
            ));
        }
        let replies = body
            .responses
            .ok_or_else(|| Error::protocol("router response missing agent responses"))?;

        for reply in &replies {
            let (text, structured) = reply.extract();
            if text.is_empty() {
                continue;
            }

            accumulator.push_block(&text);
            if let Some(data) = structured.clone() {
                accumulator.set_structured_data(data);
            }
            self.metrics.record_agent_response(&reply.agent).await;
            self.replay_words(&text, callbacks).await;
            callbacks
                .on_agent_response(&reply.agent, &text, structured.as_ref())
                .await;
        }

        accumulator.set_routing(body.suggested_next_agents, body.consulted_agents);
        Ok(())
    }

    /// Re-streams finished text one word at a time so the UI gets the same
    /// incremental reveal as a true token stream. The pacing, not the
    /// exact delay, is the contract.
    async fn replay_words<C: StreamCallbacks>(&self, text: &str, callbacks: &C) {
        for word in text.split_whitespace() {
            callbacks.on_token(&format!("{word} ")).await;
            tokio::time::sleep(self.config.replay_delay).await;
        }
    }

    async fn dispatch<C: StreamCallbacks>(
        &self,
        chunk: StreamChunk,
        callbacks: &C,
        accumulator: &mut Accumulator,
    ) -> Result<()> {
        match chunk {
            StreamChunk::Token { content } => {
                accumulator.push_text(&content);
                self.metrics.record_token().await;
                callbacks.on_token(&content).await;
            }
            StreamChunk::Citation { citation } => {
                callbacks.on_citation(&citation).await;
                accumulator.push_citation(citation);
            }
            StreamChunk::ToolCall { tool_call } => {
                callbacks.on_tool_call(&tool_call).await;
                accumulator.push_tool_call(tool_call);
            }
            StreamChunk::AgentUpdate { agents } => {
                callbacks.on_agent_update(&agents).await;
                accumulator.set_active_agents(agents);
            }
            StreamChunk::Plan { agents, complexity } => {
                callbacks.on_plan(&agents, complexity.as_deref()).await;
                accumulator.set_active_agents(agents);
            }
            StreamChunk::EstimatedTime { seconds } => {
                callbacks.on_estimated_time(seconds).await;
            }
            StreamChunk::QuestionAnalysis { data } => {
                callbacks.on_question_analysis(&data).await;
            }
            StreamChunk::AgentStart {
                agent,
                index,
                total,
            } => {
                debug!("agent {} started", agent);
                callbacks.on_agent_start(&agent, index, total).await;
            }
            StreamChunk::AgentThinking {
                agent,
                message,
                step,
                total_steps,
            } => {
                callbacks
                    .on_agent_thinking(&agent, message.as_deref(), step, total_steps)
                    .await;
            }
            StreamChunk::AgentProgress { agent, status } => {
                callbacks.on_agent_progress(&agent, &status).await;
            }
            StreamChunk::AgentResponse {
                agent,
                response,
                structured_data,
            } => {
                accumulator.push_block(&response);
                if let Some(data) = &structured_data {
                    accumulator.set_structured_data(data.clone());
                }
                self.metrics.record_agent_response(&agent).await;
                callbacks.on_token(&response).await;
                callbacks
                    .on_agent_response(&agent, &response, structured_data.as_ref())
                    .await;
            }
            StreamChunk::AgentComplete { agent, next_agent } => {
                callbacks
                    .on_agent_complete(&agent, next_agent.as_deref())
                    .await;
            }
            StreamChunk::AgentError { agent, error } => {
                // Non-fatal: fold into the transcript so the caller still
                // gets every other agent's output.
                warn!("agent {} failed mid-consultation: {}", agent, error);
                accumulator.push_block(&format!("[{agent}] agent failed: {error}"));
                self.metrics.record_agent_error(&agent).await;
                callbacks
                    .on_error(&format!("{agent} agent failed: {error}"))
                    .await;
            }
            StreamChunk::AgentSkipped { agent, reason } => {
                let reason =
                    reason.unwrap_or_else(|| "not needed for this consultation".to_string());
                accumulator.push_block(&format!("[{agent}] agent skipped: {reason}"));
                self.metrics.record_agent_skip(&agent).await;
            }
            StreamChunk::AllAgentsComplete { outputs } => {
                callbacks.on_all_agents_complete(&outputs).await;
            }
            StreamChunk::AgentChallenge { data } => callbacks.on_agent_challenge(&data).await,
            StreamChunk::AgentRevised { data } => callbacks.on_agent_revised(&data).await,
            StreamChunk::AgentDefended { data } => callbacks.on_agent_defended(&data).await,
            StreamChunk::AgentConsensus { data } => callbacks.on_agent_consensus(&data).await,
            StreamChunk::ValidationWarning { data } => {
                callbacks.on_validation_warning(&data).await;
            }
            StreamChunk::Error { error, message } => {
                let message = StreamChunk::error_message(error, message);
                error!("router reported fatal error: {}", message);
                return Err(Error::Protocol(message));
            }
            StreamChunk::Done {
                suggested_next_agents,
                consulted_agents,
            } => {
                if suggested_next_agents.is_some() || consulted_agents.is_some() {
                    accumulator.set_routing(
                        suggested_next_agents.unwrap_or_default(),
                        consulted_agents.unwrap_or_default(),
                    );
                }
            }
            StreamChunk::Unknown => debug!("ignoring unrecognised chunk type"),
        }
        Ok(())
    }
}

fn is_event_stream(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().starts_with(SSE_CONTENT_TYPE))
        .unwrap_or(false)
}
