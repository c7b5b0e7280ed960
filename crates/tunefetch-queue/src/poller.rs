/*
[INPUT]:  JobBackend (shared), QueueStore handle, per-entry CancellationToken
[OUTPUT]: One periodic tokio task per live entry feeding poll outcomes to the store
[POS]:    Execution layer - progress polling and terminal cleanup
[UPDATE]: When polling cadence, fetch failure handling, or cleanup effects change
*/

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tunefetch_adapter::JobBackend;

use crate::entry::TaskId;
use crate::state_machine::{TerminalPlan, Transition};
use crate::store::QueueStore;

/// Everything a driver or a cleanup task needs, shared by the controller.
pub(crate) struct MonitorContext<B: JobBackend> {
    pub(crate) backend: Arc<B>,
    pub(crate) store: QueueStore,
    pub(crate) tracker: TaskTracker,
    /// Root token; cancelled on controller shutdown.
    pub(crate) shutdown: CancellationToken,
    pub(crate) poll_interval: Duration,
}

impl<B: JobBackend> Clone for MonitorContext<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            store: self.store.clone(),
            tracker: self.tracker.clone(),
            shutdown: self.shutdown.clone(),
            poll_interval: self.poll_interval,
        }
    }
}

impl<B: JobBackend> MonitorContext<B> {
    /// Start polling `id` unless it already has a live driver or has ended.
    pub(crate) async fn start_driver(&self, id: &TaskId, job_token: &str) -> bool {
        let token = self.shutdown.child_token();
        if !self.store.attach_driver(id, token.clone()).await {
            tracing::debug!(task_id = %id, "driver not started");
            return false;
        }

        let driver = PollingDriver {
            id: id.clone(),
            job_token: job_token.to_string(),
            ctx: self.clone(),
            cancel: token,
        };
        self.tracker.spawn(driver.run());
        true
    }

    /// Cleanup owed once an entry ended: best-effort server delete and, for
    /// auto-removing statuses, a delayed removal from the store.
    pub(crate) fn run_terminal_effects(&self, id: &TaskId, plan: TerminalPlan) {
        tracing::info!(
            task_id = %id,
            job_token = %plan.job_token,
            status = %plan.status,
            message = %plan.message,
            "entry ended"
        );

        let backend = Arc::clone(&self.backend);
        let job_token = plan.job_token.clone();
        let task_id = id.clone();
        self.tracker.spawn(async move {
            if let Err(err) = backend.delete_job(&job_token).await {
                tracing::warn!(
                    task_id = %task_id,
                    job_token = %job_token,
                    error = %err,
                    "failed to delete server job record"
                );
            }
        });

        if let Some(delay) = plan.remove_after {
            let store = self.store.clone();
            let shutdown = self.shutdown.clone();
            let task_id = id.clone();
            self.tracker.spawn(async move {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {
                        store.remove(&task_id).await;
                    }
                }
            });
        }
    }
}

/// Periodic progress poller for a single entry.
pub struct PollingDriver<B: JobBackend> {
    id: TaskId,
    job_token: String,
    ctx: MonitorContext<B>,
    cancel: CancellationToken,
}

impl<B: JobBackend> PollingDriver<B> {
    pub fn task_id(&self) -> &TaskId {
        &self.id
    }

    /// Poll until the entry ends, disappears, or the token is cancelled.
    ///
    /// The first fetch happens immediately.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.ctx.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(task_id = %self.id, job_token = %self.job_token, "driver started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => break,
                fetched = self.ctx.backend.fetch_progress(&self.job_token) => fetched,
            };
            let observed = match fetched {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::debug!(
                        task_id = %self.id,
                        job_token = %self.job_token,
                        error = %err,
                        "progress fetch failed"
                    );
                    None
                }
            };

            if self.cancel.is_cancelled() {
                break;
            }

            match self
                .ctx
                .store
                .apply_progress(&self.id, observed.as_ref(), Instant::now())
                .await
            {
                None | Some(Transition::Ignored) => break,
                Some(Transition::Ended(plan)) => {
                    self.ctx.run_terminal_effects(&self.id, plan);
                    break;
                }
                Some(_) => {}
            }
        }

        self.cancel.cancel();
        tracing::debug!(task_id = %self.id, "driver stopped");
    }
}
