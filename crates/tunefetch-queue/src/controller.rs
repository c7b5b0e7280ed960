/*
[INPUT]:  User actions (enqueue, cancel, retry, clear, visibility), JobBackend, MonitorPolicy
[OUTPUT]: Tracked entries with running PollingDrivers, QueueEvents for renderers
[POS]:    Orchestration layer - public face of the download queue
[UPDATE]: When user-facing queue operations or shutdown guarantees change
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tunefetch_adapter::{AdapterError, ContentKind, DownloadRequest, JobBackend};

use crate::entry::{EntryMetadata, TaskEntry, TaskId, TaskStatus};
use crate::error::{QueueError, Result};
use crate::poller::MonitorContext;
use crate::state_machine::{MonitorPolicy, QueueStateMachine, Transition};
use crate::store::{QueueEvent, QueueStore, ReconciledJob};

pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-download backend options that are not part of the source reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    pub main_account: Option<String>,
    pub fallback_account: Option<String>,
    pub quality: Option<String>,
    pub fallback_quality: Option<String>,
    pub real_time: bool,
}

impl EnqueueOptions {
    fn into_request(self, kind: ContentKind, reference: String, metadata: &EntryMetadata) -> DownloadRequest {
        let mut request = DownloadRequest::new(kind, reference);
        request.main_account = self.main_account;
        request.fallback_account = self.fallback_account;
        request.quality = self.quality;
        request.fallback_quality = self.fallback_quality;
        request.real_time = self.real_time;
        request.name = metadata.name.clone();
        request.artist = metadata.artist.clone();
        request
    }
}

/// Download queue: starts backend jobs and keeps one poller per live entry.
pub struct QueueController<B: JobBackend> {
    ctx: MonitorContext<B>,
    policy: MonitorPolicy,
    visible: AtomicBool,
}

impl<B: JobBackend> QueueController<B> {
    pub fn new(backend: Arc<B>, policy: MonitorPolicy) -> Self {
        Self {
            ctx: MonitorContext {
                backend,
                store: QueueStore::new(QueueStateMachine::new(policy)),
                tracker: TaskTracker::new(),
                shutdown: CancellationToken::new(),
                poll_interval: policy.poll_interval,
            },
            policy,
            visible: AtomicBool::new(true),
        }
    }

    pub fn policy(&self) -> &MonitorPolicy {
        &self.policy
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.ctx.backend
    }

    pub fn store(&self) -> &QueueStore {
        &self.ctx.store
    }

    /// Root token of every driver; cancelling it stops all polling.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.ctx.shutdown.clone()
    }

    /// Start a download and track it.
    pub async fn enqueue(
        &self,
        kind: ContentKind,
        reference: &str,
        metadata: EntryMetadata,
        options: EnqueueOptions,
    ) -> Result<TaskId> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(QueueError::InvalidReference(
                "source reference is empty".to_string(),
            ));
        }

        let request = options.into_request(kind, reference.to_string(), &metadata);
        self.enqueue_request(request, metadata).await
    }

    /// Start a download from a fully built request. Never retries on failure.
    pub async fn enqueue_request(
        &self,
        request: DownloadRequest,
        metadata: EntryMetadata,
    ) -> Result<TaskId> {
        let handle = self
            .ctx
            .backend
            .start_download(&request)
            .await
            .map_err(|err| {
                tracing::warn!(kind = %request.kind, url = %request.url, error = %err, "enqueue failed");
                QueueError::from_enqueue(err)
            })?;

        let job_token = handle.job_token.trim().to_string();
        if job_token.is_empty() {
            return Err(QueueError::BackendUnavailable(
                AdapterError::InvalidResponse("empty job token".to_string()),
            ));
        }

        let entry = TaskEntry::new(job_token.clone(), request, metadata);
        let id = self.ctx.store.add(entry).await?;
        self.ctx.start_driver(&id, &job_token).await;

        tracing::info!(task_id = %id, job_token = %job_token, "download enqueued");
        Ok(id)
    }

    /// Ask the backend to cancel an entry's job.
    ///
    /// An entry that already ended is left untouched and its terminal status
    /// returned. If the backend does not acknowledge, the entry keeps polling.
    pub async fn cancel(&self, id: &TaskId) -> Result<TaskStatus> {
        let entry = self.ctx.store.get(id).await?;
        if entry.has_ended {
            return Ok(entry.status);
        }

        let reason = match self
            .ctx
            .backend
            .cancel_download(entry.kind, &entry.job_token)
            .await
        {
            Ok(response) if response.is_acknowledged() => None,
            Ok(response) => Some(
                response
                    .error
                    .unwrap_or_else(|| format!("backend answered status {}", response.status)),
            ),
            Err(err) => Some(err.to_string()),
        };

        if let Some(reason) = reason {
            tracing::warn!(task_id = %id, job_token = %entry.job_token, reason = %reason, "cancel failed");
            return Err(QueueError::CancelFailed {
                id: id.clone(),
                reason,
            });
        }

        match self.ctx.store.force_cancelled(id).await? {
            Transition::Ended(plan) => {
                let status = plan.status;
                self.ctx.run_terminal_effects(id, plan);
                Ok(status)
            }
            // Ended on its own while the cancel call was in flight.
            _ => Ok(self.ctx.store.get(id).await?.status),
        }
    }

    /// Re-submit a failed entry's original request as a new entry.
    pub async fn retry(&self, id: &TaskId) -> Result<TaskId> {
        let entry = self.ctx.store.get(id).await?;
        let request = match (&entry.request, entry.can_retry()) {
            (Some(request), true) => request.clone(),
            _ => {
                return Err(QueueError::NotRetryable {
                    id: id.clone(),
                    status: entry.status,
                });
            }
        };

        let metadata = EntryMetadata::new(entry.display_name, entry.display_artist);
        let new_id = self.enqueue_request(request, metadata).await?;
        self.ctx.store.remove(id).await;

        tracing::info!(task_id = %new_id, previous = %id, "download retried");
        Ok(new_id)
    }

    /// Cancel every live entry (best effort), then drop all entries.
    pub async fn clear_all(&self) -> usize {
        for id in self.ctx.store.live_ids().await {
            if let Err(err) = self.cancel(&id).await {
                tracing::warn!(task_id = %id, error = %err, "cancel during clear failed");
            }
        }

        let mut removed = 0;
        for id in self.ctx.store.ids().await {
            if self.ctx.store.remove(&id).await.is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Remove exactly the entries that have ended.
    pub async fn clear_completed(&self) -> usize {
        let mut removed = 0;
        for id in self.ctx.store.ended_ids().await {
            if self.ctx.store.remove(&id).await.is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Flip (or force) the queue panel visibility and announce it.
    pub fn toggle_visibility(&self, force: Option<bool>) -> bool {
        let visible = match force {
            Some(value) => {
                self.visible.store(value, Ordering::SeqCst);
                value
            }
            None => !self.visible.fetch_xor(true, Ordering::SeqCst),
        };
        self.ctx.store.emit(QueueEvent::VisibilityChanged { visible });
        visible
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Adopt jobs already running on the backend.
    ///
    /// Unfetchable progress is tolerated; the adopted entry starts queued and
    /// its driver takes over.
    pub async fn reconcile_existing(&self) -> Result<Vec<TaskId>> {
        let tokens = self
            .ctx
            .backend
            .list_jobs()
            .await
            .map_err(QueueError::BackendUnavailable)?;

        let mut jobs = Vec::with_capacity(tokens.len());
        for job_token in tokens {
            if self.ctx.store.tracks_token(&job_token).await {
                continue;
            }
            let progress = match self.ctx.backend.fetch_progress(&job_token).await {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::debug!(job_token = %job_token, error = %err, "no progress for listed job");
                    None
                }
            };
            jobs.push(ReconciledJob {
                job_token,
                progress,
            });
        }

        let adopted = self.ctx.store.reconcile_existing(jobs).await;
        let mut ids = Vec::with_capacity(adopted.len());
        for (id, transition) in adopted {
            match transition {
                Transition::Ended(plan) => self.ctx.run_terminal_effects(&id, plan),
                _ => {
                    let entry = self.ctx.store.get(&id).await?;
                    self.ctx.start_driver(&id, &entry.job_token).await;
                }
            }
            ids.push(id);
        }

        tracing::info!(count = ids.len(), "reconciled backend jobs");
        Ok(ids)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.ctx.store.subscribe()
    }

    pub async fn snapshot(&self) -> Vec<TaskEntry> {
        self.ctx.store.snapshot().await
    }

    pub async fn get(&self, id: &TaskId) -> Result<TaskEntry> {
        self.ctx.store.get(id).await
    }

    pub async fn live_count(&self) -> usize {
        self.ctx.store.live_count().await
    }

    /// Stop every driver and wait for tracked tasks, bounded by [`SHUTDOWN_TIMEOUT`].
    ///
    /// Server-side jobs keep running.
    pub async fn shutdown_and_wait(&self) -> Result<()> {
        self.shutdown_within(SHUTDOWN_TIMEOUT).await
    }

    pub async fn shutdown_within(&self, timeout: Duration) -> Result<()> {
        self.ctx.shutdown.cancel();
        self.ctx.tracker.close();

        tokio::select! {
            _ = self.ctx.tracker.wait() => {
                tracing::debug!("all queue tasks stopped");
                Ok(())
            }
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(timeout = ?timeout, "queue tasks still running at shutdown deadline");
                Err(QueueError::ShutdownTimeout(timeout))
            }
        }
    }
}
