//! HTTP client for the agent-routing endpoint.
//! Handles request issue, credential headers, and status classification.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use elecmate_core::{Error, Result, DEFAULT_AGENT};
use reqwest::header::ACCEPT;
use reqwest::Response;
use tracing::{debug, error};

use crate::api::{classify_status, ConsultRequest};
use crate::auth::Session;
use crate::metrics::ConsultationMetrics;
use crate::watchdog::WatchdogConfig;

/// Configuration for a [`RouterClient`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Full URL of the agent-routing endpoint
    pub endpoint: String,
    /// Agent consulted when the caller selects none
    pub default_agent: String,
    /// Gap between words when replaying a non-streamed response
    pub replay_delay: Duration,
    /// Tick/warning/deadline schedule applied to every call
    pub watchdog: WatchdogConfig,
}

impl RouterConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            default_agent: DEFAULT_AGENT.to_string(),
            replay_delay: Duration::from_millis(20),
            watchdog: WatchdogConfig::default(),
        }
    }
}

/// Client for consultation exchanges with the agent router.
///
/// Cheap to share behind an `Arc`; concurrent consultations do not share
/// any per-call state, only the metrics collector and the advisory
/// streaming flag.
pub struct RouterClient {
    pub(crate) config: RouterConfig,
    http: reqwest::Client,
    session: Option<Session>,
    pub(crate) metrics: Arc<ConsultationMetrics>,
    streaming: AtomicBool,
}

impl RouterClient {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            session: None,
            metrics: Arc::new(ConsultationMetrics::new()),
            streaming: AtomicBool::new(false),
        }
    }

    /// Attaches signed-in session credentials to every request.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// True while a consultation is in flight on this client.
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> Arc<ConsultationMetrics> {
        self.metrics.clone()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub(crate) fn engage_streaming(&self) -> StreamingGuard<'_> {
        self.streaming.store(true, Ordering::SeqCst);
        StreamingGuard {
            flag: &self.streaming,
        }
    }

    /// Issues the consultation request and classifies any failure status.
    pub(crate) async fn send(&self, request: &ConsultRequest) -> Result<Response> {
        debug!(
            "posting consultation for agents {:?}",
            request.selected_agents
        );

        let mut builder = self
            .http
            .post(&self.config.endpoint)
            .header(ACCEPT, "application/json")
            .json(request);
        if let Some(session) = &self.session {
            builder = session.apply(builder);
        }

        let response = builder.send().await.map_err(|err| {
            error!("router request failed: {}", err);
            Error::Unavailable
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        Ok(response)
    }
}

/// Clears the streaming flag on every exit path.
pub(crate) struct StreamingGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for StreamingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
