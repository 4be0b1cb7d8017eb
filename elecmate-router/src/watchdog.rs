//! Per-consultation watchdog.
//!
//! One background task drives everything time-related for a single call:
//! the once-a-second elapsed tick, the escalating "still working" notes,
//! and the hard deadline that aborts the exchange. Keeping the schedule in
//! one task means there is exactly one thing to tear down on any exit
//! path; dropping the [`Watchdog`] aborts it.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Schedule for one consultation's timers.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Interval between elapsed-time ticks
    pub tick: Duration,
    /// Escalating notes, ordered by deadline
    pub warnings: Vec<(Duration, String)>,
    /// Hard deadline for the whole exchange
    pub timeout: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            warnings: vec![
                (
                    Duration::from_secs(30),
                    "Agents are still working on your consultation...".to_string(),
                ),
                (
                    Duration::from_secs(90),
                    "Still working. Complex designs can take a couple of minutes.".to_string(),
                ),
                (
                    Duration::from_secs(180),
                    "Nearly there. Finalising agent responses.".to_string(),
                ),
            ],
            timeout: Duration::from_secs(300),
        }
    }
}

/// Events the watchdog task emits, in deadline order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// Seconds elapsed since the call started
    Tick(u64),
    /// One of the escalating reassurance notes
    StillWorking(String),
    /// The hard deadline passed; the exchange must abort
    TimedOut,
}

/// Handle to a running watchdog task.
pub struct Watchdog {
    rx: mpsc::Receiver<WatchdogEvent>,
    task: JoinHandle<()>,
}

impl Watchdog {
    /// Starts the schedule. The clock begins now.
    pub fn start(config: WatchdogConfig) -> Self {
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(run_schedule(config, tx));
        Self { rx, task }
    }

    /// Next event in deadline order. After `TimedOut` the schedule is
    /// exhausted and this pends forever; callers are expected to stop
    /// selecting on it once they abort.
    pub async fn next(&mut self) -> WatchdogEvent {
        match self.rx.recv().await {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_schedule(config: WatchdogConfig, tx: mpsc::Sender<WatchdogEvent>) {
    let started = Instant::now();
    let deadline = started + config.timeout;
    let mut warnings = config.warnings.into_iter();
    let mut next_warning = warnings.next().map(|(after, note)| (started + after, note));
    let mut next_tick = started + config.tick;

    loop {
        // Earliest of: tick, pending warning, hard deadline.
        let mut wake = next_tick.min(deadline);
        if let Some((at, _)) = &next_warning {
            wake = wake.min(*at);
        }
        tokio::time::sleep_until(wake).await;
        let now = Instant::now();

        if now >= deadline {
            debug!("consultation deadline reached");
            let _ = tx.send(WatchdogEvent::TimedOut).await;
            return;
        }

        let warning_due = matches!(&next_warning, Some((at, _)) if now >= *at);
        if warning_due {
            if let Some((_, note)) = next_warning.take() {
                if tx.send(WatchdogEvent::StillWorking(note)).await.is_err() {
                    return;
                }
            }
            next_warning = warnings.next().map(|(after, note)| (started + after, note));
            continue;
        }

        if now >= next_tick {
            let elapsed = started.elapsed().as_secs();
            if tx.send(WatchdogEvent::Tick(elapsed)).await.is_err() {
                return;
            }
            next_tick += config.tick;
        }
    }
}
