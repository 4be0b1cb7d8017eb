//! Metrics collection for consultations.
//! Tracks per-agent activity, chunk volume, and call latency.

use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use tokio::sync::RwLock;
use tracing::debug;

/// Counters for one named agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentActivity {
    /// Completed responses this agent produced
    pub responses: u64,
    /// Mid-stream failures reported for this agent
    pub errors: u64,
    /// Times the router skipped this agent
    pub skips: u64,
}

/// Point-in-time view of everything recorded so far.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub consultations: u64,
    pub successes: u64,
    pub failures: u64,
    /// Token chunks received across all consultations
    pub token_chunks: u64,
    /// Rolling average wall-clock time per settled consultation
    pub avg_latency: Duration,
    pub agents: HashMap<String, AgentActivity>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    snapshot: MetricsSnapshot,
}

/// Collector shared by a client and its callers.
#[derive(Debug, Default)]
pub struct ConsultationMetrics {
    inner: Arc<RwLock<MetricsInner>>,
}

impl ConsultationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_success(&self, latency: Duration) {
        let mut inner = self.inner.write().await;
        inner.snapshot.consultations += 1;
        inner.snapshot.successes += 1;
        Self::fold_latency(&mut inner.snapshot, latency);
        debug!("consultation succeeded in {:?}", latency);
    }

    pub async fn record_failure(&self, latency: Duration) {
        let mut inner = self.inner.write().await;
        inner.snapshot.consultations += 1;
        inner.snapshot.failures += 1;
        Self::fold_latency(&mut inner.snapshot, latency);
    }

    pub async fn record_token(&self) {
        self.inner.write().await.snapshot.token_chunks += 1;
    }

    pub async fn record_agent_response(&self, agent: &str) {
        let mut inner = self.inner.write().await;
        inner.snapshot.agents.entry(agent.to_string()).or_default().responses += 1;
    }

    pub async fn record_agent_error(&self, agent: &str) {
        let mut inner = self.inner.write().await;
        inner.snapshot.agents.entry(agent.to_string()).or_default().errors += 1;
    }

    pub async fn record_agent_skip(&self, agent: &str) {
        let mut inner = self.inner.write().await;
        inner.snapshot.agents.entry(agent.to_string()).or_default().skips += 1;
    }

    /// Clones the current counters.
    pub async fn snapshot(&self) -> MetricsSnapshot {
        self.inner.read().await.snapshot.clone()
    }

    fn fold_latency(snapshot: &mut MetricsSnapshot, latency: Duration) {
        let settled = snapshot.successes + snapshot.failures;
        if settled <= 1 {
            snapshot.avg_latency = latency;
        } else {
            let prior = snapshot.avg_latency.as_millis() as u64 * (settled - 1);
            snapshot.avg_latency =
                Duration::from_millis((prior + latency.as_millis() as u64) / settled);
        }
    }
}
