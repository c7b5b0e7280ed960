/*
[INPUT]:  New TaskEntries, poll outcomes, reconciled backend jobs, removal requests
[OUTPUT]: Concurrency-safe registry of tracked entries and a stream of QueueEvents
[POS]:    State layer - single source of truth for the download queue
[UPDATE]: When entry bookkeeping, reconciliation, or change events change
*/

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tunefetch_adapter::ProgressRecord;

use crate::entry::{TaskEntry, TaskId, TaskStatus};
use crate::error::{QueueError, Result};
use crate::state_machine::{QueueStateMachine, Transition};

const EVENT_CAPACITY: usize = 256;

/// Change notifications for renderers, keyed by entry id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Added { id: TaskId, status: TaskStatus },
    Updated {
        id: TaskId,
        status: TaskStatus,
        message: Option<String>,
    },
    Removed { id: TaskId },
    VisibilityChanged { visible: bool },
}

/// A job the backend reports as in flight, with its current progress if it
/// could be fetched.
#[derive(Debug, Clone)]
pub struct ReconciledJob {
    pub job_token: String,
    pub progress: Option<ProgressRecord>,
}

#[derive(Debug)]
struct Slot {
    entry: TaskEntry,
    driver: Option<CancellationToken>,
}

impl Slot {
    fn stop_driver(&mut self) {
        if let Some(token) = self.driver.take() {
            token.cancel();
        }
    }
}

/// Registry of tracked entries keyed by [`TaskId`].
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone)]
pub struct QueueStore {
    slots: Arc<Mutex<HashMap<TaskId, Slot>>>,
    events: broadcast::Sender<QueueEvent>,
    machine: QueueStateMachine,
}

impl QueueStore {
    pub fn new(machine: QueueStateMachine) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            events,
            machine,
        }
    }

    pub fn machine(&self) -> &QueueStateMachine {
        &self.machine
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: QueueEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.events.send(event);
    }

    /// Insert a new entry. Fails if a live entry already tracks its token.
    pub async fn add(&self, entry: TaskEntry) -> Result<TaskId> {
        let mut slots = self.slots.lock().await;
        if slots
            .values()
            .any(|slot| slot.entry.is_live() && slot.entry.job_token == entry.job_token)
        {
            return Err(QueueError::DuplicateToken {
                job_token: entry.job_token,
            });
        }

        let id = entry.id.clone();
        let status = entry.status;
        tracing::debug!(
            task_id = %id,
            job_token = %entry.job_token,
            kind = %entry.kind,
            "entry added"
        );
        slots.insert(
            id.clone(),
            Slot {
                entry,
                driver: None,
            },
        );
        drop(slots);

        self.emit(QueueEvent::Added {
            id: id.clone(),
            status,
        });
        Ok(id)
    }

    pub async fn get(&self, id: &TaskId) -> Result<TaskEntry> {
        self.slots
            .lock()
            .await
            .get(id)
            .map(|slot| slot.entry.clone())
            .ok_or_else(|| QueueError::NotFound(id.clone()))
    }

    /// Delete an entry and stop its driver. Returns the entry if it existed.
    pub async fn remove(&self, id: &TaskId) -> Option<TaskEntry> {
        let removed = self.slots.lock().await.remove(id);
        let mut slot = removed?;
        slot.stop_driver();
        tracing::debug!(task_id = %id, status = %slot.entry.status, "entry removed");
        self.emit(QueueEvent::Removed { id: id.clone() });
        Some(slot.entry)
    }

    /// Register the cancellation token of an entry's polling driver.
    ///
    /// Returns false (and leaves the existing driver alone) if the entry is
    /// gone, already ended, or already has a running driver.
    pub async fn attach_driver(&self, id: &TaskId, token: CancellationToken) -> bool {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(id) else {
            return false;
        };
        if slot.entry.has_ended {
            return false;
        }
        if slot
            .driver
            .as_ref()
            .is_some_and(|existing| !existing.is_cancelled())
        {
            return false;
        }
        slot.driver = Some(token);
        true
    }

    /// Feed one poll outcome through the state machine under the store lock.
    ///
    /// Returns `None` when the entry no longer exists.
    pub async fn apply_progress(
        &self,
        id: &TaskId,
        observed: Option<&ProgressRecord>,
        now: Instant,
    ) -> Option<Transition> {
        let mut slots = self.slots.lock().await;
        let slot = slots.get_mut(id)?;
        let transition = self.machine.apply(&mut slot.entry, observed, now);
        if matches!(transition, Transition::Ended(_)) {
            slot.stop_driver();
        }
        let event = change_event(&slot.entry, &transition);
        drop(slots);

        if let Some(event) = event {
            self.emit(event);
        }
        Some(transition)
    }

    /// End an entry as cancelled after the backend acknowledged the cancel.
    pub async fn force_cancelled(&self, id: &TaskId) -> Result<Transition> {
        let mut slots = self.slots.lock().await;
        let slot = slots
            .get_mut(id)
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;
        let transition = self.machine.force_cancelled(&mut slot.entry);
        if matches!(transition, Transition::Ended(_)) {
            slot.stop_driver();
        }
        let event = change_event(&slot.entry, &transition);
        drop(slots);

        if let Some(event) = event {
            self.emit(event);
        }
        Ok(transition)
    }

    /// Adopt backend jobs that are not tracked yet.
    ///
    /// Each adopted entry gets placeholder metadata and its status seeded by
    /// running its current remote progress through the state machine. Returns
    /// the new ids with the seeding transition.
    pub async fn reconcile_existing(&self, jobs: Vec<ReconciledJob>) -> Vec<(TaskId, Transition)> {
        let now = Instant::now();
        let mut adopted = Vec::new();
        let mut events = Vec::new();

        {
            let mut slots = self.slots.lock().await;
            for job in jobs {
                if slots
                    .values()
                    .any(|slot| slot.entry.job_token == job.job_token)
                {
                    continue;
                }

                let mut entry = TaskEntry::adopted(job.job_token.clone(), job.progress.as_ref());
                let id = entry.id.clone();
                events.push(QueueEvent::Added {
                    id: id.clone(),
                    status: entry.status,
                });

                let transition = self.machine.apply(&mut entry, job.progress.as_ref(), now);
                if let Some(event) = change_event(&entry, &transition) {
                    events.push(event);
                }

                tracing::info!(
                    task_id = %id,
                    job_token = %job.job_token,
                    status = %entry.status,
                    "adopted in-flight job"
                );
                slots.insert(
                    id.clone(),
                    Slot {
                        entry,
                        driver: None,
                    },
                );
                adopted.push((id, transition));
            }
        }

        for event in events {
            self.emit(event);
        }
        adopted
    }

    /// All entries, oldest first.
    pub async fn snapshot(&self) -> Vec<TaskEntry> {
        let mut entries: Vec<TaskEntry> = self
            .slots
            .lock()
            .await
            .values()
            .map(|slot| slot.entry.clone())
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }

    /// Number of entries still being polled.
    pub async fn live_count(&self) -> usize {
        self.slots
            .lock()
            .await
            .values()
            .filter(|slot| slot.entry.is_live())
            .count()
    }

    pub async fn ids(&self) -> Vec<TaskId> {
        self.slots.lock().await.keys().cloned().collect()
    }

    pub async fn ended_ids(&self) -> Vec<TaskId> {
        self.slots
            .lock()
            .await
            .values()
            .filter(|slot| slot.entry.has_ended)
            .map(|slot| slot.entry.id.clone())
            .collect()
    }

    pub async fn live_ids(&self) -> Vec<TaskId> {
        self.slots
            .lock()
            .await
            .values()
            .filter(|slot| slot.entry.is_live())
            .map(|slot| slot.entry.id.clone())
            .collect()
    }

    pub async fn tracks_token(&self, job_token: &str) -> bool {
        self.slots
            .lock()
            .await
            .values()
            .any(|slot| slot.entry.job_token == job_token)
    }
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new(QueueStateMachine::default())
    }
}

/// Events already buffered on `events`, in order, without waiting.
///
/// Lagged gaps are skipped; the drain stops once the channel is empty or closed.
pub fn drain_pending(events: &mut broadcast::Receiver<QueueEvent>) -> Vec<QueueEvent> {
    let mut pending = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => pending.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event backlog overflowed while draining");
            }
            Err(_) => break,
        }
    }
    pending
}

fn change_event(entry: &TaskEntry, transition: &Transition) -> Option<QueueEvent> {
    transition.is_change().then(|| QueueEvent::Updated {
        id: entry.id.clone(),
        status: entry.status,
        message: entry.message.clone(),
    })
}
