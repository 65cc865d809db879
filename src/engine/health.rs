use super::AnalysisBackend;
use crate::model::HealthStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

/// Owns the periodic health probe task. Dropping the guard aborts the task
/// together with any probe still in flight.
#[derive(Debug)]
pub(crate) struct PollerGuard {
    handle: JoinHandle<()>,
}

impl PollerGuard {
    pub(crate) fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.handle.abort_handle()
    }

    /// Abort and wait until the task is gone.
    pub(crate) async fn stop(mut self) {
        self.handle.abort();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for PollerGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Decrements the live-poller count when the poll future is dropped,
/// whether it was aborted before or after its first poll.
struct LiveCount(Arc<AtomicUsize>);

impl LiveCount {
    fn acquire(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for LiveCount {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn probe<B: AnalysisBackend>(backend: &B) -> HealthStatus {
    let outcome = backend.health().await;
    if let Err(e) = &outcome {
        tracing::debug!(error = %e, "health probe failed");
    }
    HealthStatus::from_probe(&outcome)
}

/// Probe immediately, then once per `interval`, publishing each result.
///
/// Each tick's probe runs on its own so a slow probe never delays the timer;
/// overlapping probes race and the last one to resolve wins.
pub(crate) fn spawn_health_poller<B: AnalysisBackend>(
    backend: Arc<B>,
    interval: Duration,
    status_tx: Arc<watch::Sender<HealthStatus>>,
    live: Arc<AtomicUsize>,
) -> PollerGuard {
    let live = LiveCount::acquire(live);
    let handle = tokio::spawn(async move {
        let _live = live;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("health probe tick");
                    let backend = backend.clone();
                    let tx = status_tx.clone();
                    in_flight.spawn(async move {
                        let status = probe(&*backend).await;
                        let previous = tx.send_replace(status);
                        if previous != status {
                            tracing::info!(?previous, current = ?status, "backend health changed");
                        }
                    });
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }
    });
    PollerGuard { handle }
}
