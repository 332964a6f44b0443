//! Backend readiness polling.
//!
//! The poller is a small state machine owned by the UI loop:
//!
//! ```text
//! Idle -> Probing -> Waiting -> Probing -> ... -> Stopped
//! ```
//!
//! Probes and delays run as spawned tasks that report back through
//! `AppEvent::HealthChecked` and `AppEvent::PollDue`. Each cycle carries a
//! token, and events for any cycle other than the current one are dropped, so
//! at most one probe is ever outstanding. Polling stops for good once the
//! backend reports ready.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiError, Backend, HealthResponse};
use crate::sink::UiSink;
use crate::state::Readiness;
use crate::tui::AppEvent;

pub const READY_PLACEHOLDER: &str = "Ask about your logs...";
pub const WAITING_PLACEHOLDER: &str = "Waiting for model download...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCycle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Probing(PollCycle),
    Waiting(PollCycle),
    Stopped,
}

pub struct ReadinessPoller<B> {
    backend: Arc<B>,
    events: mpsc::UnboundedSender<AppEvent>,
    interval: Duration,
    phase: Phase,
    next_cycle: u64,
    task: Option<JoinHandle<()>>,
    last: Option<Readiness>,
}

/// Run one health probe and classify the outcome.
pub async fn probe<B: Backend>(backend: &B) -> Readiness {
    classify(backend.health().await)
}

fn classify(result: Result<HealthResponse, ApiError>) -> Readiness {
    match result {
        Ok(health) => health.readiness(),
        Err(err) => {
            warn!(error = %err, "health check failed");
            Readiness::Unreachable
        }
    }
}

pub fn banner_text(model: &str) -> String {
    format!("Model is downloading... ({}). Please wait.", model)
}

impl<B: Backend> ReadinessPoller<B> {
    pub fn new(backend: Arc<B>, events: mpsc::UnboundedSender<AppEvent>, interval: Duration) -> Self {
        Self {
            backend,
            events,
            interval,
            phase: Phase::Idle,
            next_cycle: 0,
            task: None,
            last: None,
        }
    }

    /// Kick off the first probe. Same as `trigger`, named for the call site.
    pub fn start(&mut self) -> bool {
        self.trigger()
    }

    /// Probe now unless a probe is already in flight or polling has stopped.
    /// A pending delay is cancelled and replaced by the immediate probe.
    pub fn trigger(&mut self) -> bool {
        match self.phase {
            Phase::Idle | Phase::Waiting(_) => {
                self.probe_now();
                true
            }
            Phase::Probing(cycle) => {
                debug!(cycle = cycle.0, "health probe already in flight");
                false
            }
            Phase::Stopped => false,
        }
    }

    /// The delay for `cycle` has elapsed
    pub fn on_due(&mut self, cycle: PollCycle) {
        if self.phase == Phase::Waiting(cycle) {
            self.probe_now();
        } else {
            debug!(cycle = cycle.0, "ignoring stale poll timer");
        }
    }

    /// Apply the result of the probe for `cycle`. Returns `None` for stale
    /// results, which leave everything untouched.
    pub fn on_health<S: UiSink>(
        &mut self,
        cycle: PollCycle,
        result: Result<HealthResponse, ApiError>,
        ui: &mut S,
    ) -> Option<Readiness> {
        if self.phase != Phase::Probing(cycle) {
            debug!(cycle = cycle.0, "ignoring stale health result");
            return None;
        }
        self.task = None;

        let readiness = classify(result);
        debug!(cycle = cycle.0, readiness = %readiness, "health probe finished");
        match &readiness {
            Readiness::Downloading { model } => {
                ui.show_banner(&banner_text(model));
                ui.set_input_enabled(false);
                ui.set_input_placeholder(WAITING_PLACEHOLDER);
                if self.last.as_ref() != Some(&readiness) {
                    info!(model = %model, "model is downloading; input disabled");
                }
                self.schedule_next();
            }
            Readiness::Ready => {
                ui.remove_banner();
                ui.set_input_enabled(true);
                ui.set_input_placeholder(READY_PLACEHOLDER);
                info!("backend ready; readiness polling stopped");
                self.phase = Phase::Stopped;
            }
            // Gating stays as the last successful probe left it
            Readiness::Unreachable => self.schedule_next(),
        }

        self.last = Some(readiness.clone());
        Some(readiness)
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }

    pub fn shutdown(&mut self) {
        self.abort_task();
        self.phase = Phase::Stopped;
    }

    fn take_cycle(&mut self) -> PollCycle {
        let cycle = PollCycle(self.next_cycle);
        self.next_cycle += 1;
        cycle
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn probe_now(&mut self) {
        self.abort_task();
        let cycle = self.take_cycle();
        self.phase = Phase::Probing(cycle);
        debug!(cycle = cycle.0, "probing backend health");

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            let result = backend.health().await;
            let _ = events.send(AppEvent::HealthChecked { cycle, result });
        }));
    }

    fn schedule_next(&mut self) {
        let cycle = self.take_cycle();
        self.phase = Phase::Waiting(cycle);

        let delay = self.interval;
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(AppEvent::PollDue(cycle));
        }));
    }
}

impl<B> Drop for ReadinessPoller<B> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
