//! Run/status lifecycle controller.
//!
//! Owns backend health polling and the analysis run state machine, and emits
//! events for presentation layers.

use crate::engine::{spawn_health_poller, AnalysisBackend, PollerGuard};
use crate::model::{
    AnalysisRequest, DashboardConfig, DashboardEvent, HealthStatus, RunSnapshot, RunState,
};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

/// Commands emitted by UI layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UiCommand {
    RunAnalysis,
    Quit,
}

pub(crate) struct DashboardController<B: AnalysisBackend> {
    backend: Arc<B>,
    plant_name: String,
    poll_interval: Duration,
    health_tx: Arc<watch::Sender<HealthStatus>>,
    run_tx: Arc<watch::Sender<RunSnapshot>>,
    running: Arc<AtomicBool>,
    live_pollers: Arc<AtomicUsize>,
    active_poller: Mutex<Option<AbortHandle>>,
}

impl<B: AnalysisBackend> DashboardController<B> {
    pub(crate) fn new(backend: B, cfg: &DashboardConfig) -> Self {
        let (health_tx, _) = watch::channel(HealthStatus::Connecting);
        let (run_tx, _) = watch::channel(RunSnapshot::default());
        Self {
            backend: Arc::new(backend),
            plant_name: cfg.plant_name.clone(),
            poll_interval: cfg.poll_interval,
            health_tx: Arc::new(health_tx),
            run_tx: Arc::new(run_tx),
            running: Arc::new(AtomicBool::new(false)),
            live_pollers: Arc::new(AtomicUsize::new(0)),
            active_poller: Mutex::new(None),
        }
    }

    pub(crate) fn health_status(&self) -> HealthStatus {
        *self.health_tx.borrow()
    }

    pub(crate) fn snapshot(&self) -> RunSnapshot {
        self.run_tx.borrow().clone()
    }

    pub(crate) fn subscribe_health(&self) -> watch::Receiver<HealthStatus> {
        self.health_tx.subscribe()
    }

    pub(crate) fn subscribe_runs(&self) -> watch::Receiver<RunSnapshot> {
        self.run_tx.subscribe()
    }

    /// Number of poller tasks currently alive.
    pub(crate) fn live_pollers(&self) -> usize {
        self.live_pollers.load(Ordering::SeqCst)
    }

    /// Reset health to `Connecting` and start probing. Any poller started
    /// earlier is aborted first, so at most one timer is ever active.
    pub(crate) fn start_health_polling(&self) -> PollerGuard {
        let mut active = self
            .active_poller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = active.take() {
            previous.abort();
        }
        self.health_tx.send_replace(HealthStatus::Connecting);
        let guard = spawn_health_poller(
            self.backend.clone(),
            self.poll_interval,
            self.health_tx.clone(),
            self.live_pollers.clone(),
        );
        *active = Some(guard.abort_handle());
        tracing::debug!(interval = ?self.poll_interval, "health polling started");
        guard
    }

    /// Probe once and publish the result. Never fails.
    pub(crate) async fn probe_once(&self) -> HealthStatus {
        let outcome = self.backend.health().await;
        if let Err(e) = &outcome {
            tracing::debug!(error = %e, "health probe failed");
        }
        let status = HealthStatus::from_probe(&outcome);
        self.health_tx.send_replace(status);
        status
    }

    /// Start an analysis run unless one is already in flight.
    ///
    /// Returns `None` without touching the network when a run is in progress.
    /// The prior error is cleared as soon as the new run is accepted; the
    /// terminal state and `running == false` are committed together.
    pub(crate) fn trigger_run(&self) -> Option<JoinHandle<()>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("analysis already running; ignoring trigger");
            return None;
        }
        self.run_tx.send_modify(|snap| snap.state = RunState::Running);
        tracing::info!(plant = %self.plant_name, "analysis run started");

        let backend = self.backend.clone();
        let run_tx = self.run_tx.clone();
        let running = self.running.clone();
        let request = AnalysisRequest {
            plant_name: self.plant_name.clone(),
        };
        Some(tokio::spawn(async move {
            let outcome = backend.analyze(&request).await;
            // The flag is released under the channel's write lock, together with the terminal state.
            run_tx.send_modify(|snap| {
                match outcome {
                    Ok(result) => {
                        tracing::info!(aep_gwh = result.aep_gwh, mode = ?result.mode, "analysis run succeeded");
                        let result = Arc::new(result);
                        snap.last_result = Some(result.clone());
                        snap.state = RunState::Succeeded(result);
                    }
                    Err(e) => {
                        tracing::warn!(error = ?e, "analysis run failed");
                        snap.state = RunState::Failed(e);
                    }
                }
                running.store(false, Ordering::Release);
            });
        }))
    }

    /// Trigger a run and wait for its terminal state.
    pub(crate) async fn run_to_completion(&self) -> RunSnapshot {
        if let Some(handle) = self.trigger_run() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "analysis task join failed");
            }
        }
        self.snapshot()
    }
}

/// Forward controller state to presentation layers and apply UI commands
/// until the UI quits.
pub(crate) async fn run_controller<B: AnalysisBackend>(
    controller: DashboardController<B>,
    run_on_launch: bool,
    event_tx: UnboundedSender<DashboardEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut health_rx = controller.subscribe_health();
    let mut run_rx = controller.subscribe_runs();
    let poller = controller.start_health_polling();
    let mut in_flight: Option<JoinHandle<()>> = None;

    let _ = event_tx.send(DashboardEvent::Health(*health_rx.borrow_and_update()));
    if run_on_launch {
        in_flight = controller.trigger_run();
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::RunAnalysis) => {
                        match controller.trigger_run() {
                            Some(handle) => in_flight = Some(handle),
                            None => {
                                let _ = event_tx.send(DashboardEvent::Info(
                                    "Analysis already running…".into(),
                                ));
                            }
                        }
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            changed = health_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = *health_rx.borrow_and_update();
                let _ = event_tx.send(DashboardEvent::Health(status));
            }
            changed = run_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = run_rx.borrow_and_update().clone();
                if !snap.is_running() {
                    in_flight = None;
                }
                let _ = event_tx.send(DashboardEvent::Run(snap));
            }
        }
    }

    // Don't let a late response write state after teardown.
    if let Some(handle) = in_flight.take() {
        handle.abort();
    }
    poller.stop().await;
    tracing::debug!(
        live_pollers = controller.live_pollers(),
        health = controller.health_status().label(),
        "controller loop finished"
    );
    Ok(())
}
