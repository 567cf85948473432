use crate::lifecycle::GrantLifecycle;
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};

/// The background auditor that enforces the receipt deadline.
///
/// Runs in its own task and periodically sanctions a pending transaction whose
/// receipt has not arrived in time. The deadline itself is owned here, not by the
/// ledger, which has no notion of time.
pub struct DeadlineWatcher {
    lifecycle: Arc<GrantLifecycle>,
    period: Duration,
}

impl DeadlineWatcher {
    pub fn new(lifecycle: Arc<GrantLifecycle>) -> Self {
        let period = Duration::from_secs(lifecycle.settings().deadline_check_interval_secs);
        Self { lifecycle, period }
    }

    /// Runs a single check against the current time.
    pub async fn check_once(&self) {
        match self.lifecycle.sweep_deadline(Utc::now()).await {
            Ok(Some(report)) => tracing::warn!(%report, "Deadline watcher applied a sanction."),
            Ok(None) => tracing::trace!("Deadline watcher: nothing overdue."),
            Err(e) => tracing::error!(error = %e, "Deadline watcher failed to apply a sanction."),
        }
    }

    pub async fn run(self) {
        tracing::info!(period_secs = self.period.as_secs(), "Deadline watcher started.");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }

    /// Spawns the watcher. Abort the returned handle to stop it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
