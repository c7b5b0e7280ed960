/*
[INPUT]:  TaskEntry, latest ProgressRecord (or none after a failed fetch), monotonic now
[OUTPUT]: Mutated TaskEntry plus a Transition describing side effects to run
[POS]:    Domain logic - download lifecycle state machine
[UPDATE]: When status mapping, inactivity policy, or terminal handling changes
*/

use std::time::Duration;
use tokio::time::Instant;
use tunefetch_adapter::{ProgressRecord, ProgressStatus};

use crate::entry::{TaskEntry, TaskStatus};
use crate::formatter::{format_cancelled, format_status, format_timeout};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_REMOVAL_GRACE: Duration = Duration::from_secs(5);

/// Timing policy shared by the state machine and the polling drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorPolicy {
    pub poll_interval: Duration,
    /// Unchanged progress for longer than this ends a non-real-time entry.
    pub inactivity_timeout: Duration,
    /// How long completed/cancelled/skipped entries stay visible.
    pub removal_grace: Duration,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            removal_grace: DEFAULT_REMOVAL_GRACE,
        }
    }
}

/// Side effects owed after an entry reached a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalPlan {
    pub status: TaskStatus,
    pub message: String,
    pub job_token: String,
    /// `Some` when the entry leaves the queue on its own after this delay.
    pub remove_after: Option<Duration>,
}

/// Outcome of feeding one observation to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Entry already ended; nothing changed.
    Ignored,
    /// No new progress; entry still within its inactivity budget.
    Inactive,
    /// A record for a different kind arrived; counted as activity only.
    Touched,
    /// New progress applied.
    Updated { status: TaskStatus, message: String },
    /// Entry ended; the plan lists the cleanup to perform.
    Ended(TerminalPlan),
}

impl Transition {
    /// Whether the entry visibly changed (listeners should re-render).
    pub fn is_change(&self) -> bool {
        matches!(self, Transition::Updated { .. } | Transition::Ended(_))
    }
}

/// Maps a record status onto the client lifecycle. `None` keeps the current status.
pub fn status_for(status: &ProgressStatus) -> Option<TaskStatus> {
    match status {
        ProgressStatus::Queued => Some(TaskStatus::Queued),
        ProgressStatus::Initializing => Some(TaskStatus::Initializing),
        ProgressStatus::Downloading
        | ProgressStatus::Progress { .. }
        | ProgressStatus::RealTime { .. } => Some(TaskStatus::Downloading),
        ProgressStatus::Processing => Some(TaskStatus::Processing),
        ProgressStatus::Retrying { .. } => Some(TaskStatus::Retrying),
        ProgressStatus::Done => Some(TaskStatus::Completed),
        ProgressStatus::Error { .. } => Some(TaskStatus::Error),
        ProgressStatus::Cancelled => Some(TaskStatus::Cancelled),
        ProgressStatus::Skipped { .. } => Some(TaskStatus::Skipped),
        ProgressStatus::Unknown => None,
    }
}

/// Transition rules for tracked entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStateMachine {
    policy: MonitorPolicy,
}

impl QueueStateMachine {
    pub fn new(policy: MonitorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MonitorPolicy {
        &self.policy
    }

    /// Apply one poll outcome to `entry`.
    ///
    /// `observed` is `None` when the fetch failed for any reason.
    pub fn apply(
        &self,
        entry: &mut TaskEntry,
        observed: Option<&ProgressRecord>,
        now: Instant,
    ) -> Transition {
        if entry.has_ended {
            return Transition::Ignored;
        }

        let Some(record) = observed else {
            return self.inactivity(entry, now);
        };

        entry.infer_kind(record);
        if !record.addressed_to(entry.kind) {
            if entry.last_observed.as_ref() == Some(record) {
                return self.inactivity(entry, now);
            }
            entry.last_observed = Some(record.clone());
            entry.last_updated_at = now;
            return Transition::Touched;
        }

        if entry.last_progress.as_ref() == Some(record) {
            entry.last_observed = Some(record.clone());
            return self.inactivity(entry, now);
        }

        entry.last_progress = Some(record.clone());
        entry.last_observed = Some(record.clone());
        entry.last_updated_at = now;

        if matches!(record.status, ProgressStatus::RealTime { .. }) {
            entry.real_time = true;
        }
        match &record.status {
            ProgressStatus::Retrying {
                retry_count,
                seconds_left,
                ..
            } => {
                entry.retry_count = *retry_count;
                entry.seconds_until_retry = *seconds_left;
            }
            _ => {
                entry.retry_count = None;
                entry.seconds_until_retry = None;
            }
        }

        let message = format_status(record, entry.kind);
        let status = status_for(&record.status).unwrap_or(entry.status);

        if record.is_terminal() {
            return self.end(entry, status, message);
        }

        entry.status = status;
        entry.message = Some(message.clone());
        Transition::Updated { status, message }
    }

    /// End an entry because the backend acknowledged its cancellation.
    pub fn force_cancelled(&self, entry: &mut TaskEntry) -> Transition {
        if entry.has_ended {
            return Transition::Ignored;
        }
        self.end(entry, TaskStatus::Cancelled, format_cancelled())
    }

    fn inactivity(&self, entry: &mut TaskEntry, now: Instant) -> Transition {
        if entry.real_time {
            return Transition::Inactive;
        }

        let idle = now.saturating_duration_since(entry.last_updated_at);
        if idle > self.policy.inactivity_timeout {
            return self.end(entry, TaskStatus::Timeout, format_timeout(idle));
        }

        Transition::Inactive
    }

    fn end(&self, entry: &mut TaskEntry, status: TaskStatus, message: String) -> Transition {
        entry.has_ended = true;
        entry.status = status;
        entry.message = Some(message.clone());
        entry.retry_count = None;
        entry.seconds_until_retry = None;

        Transition::Ended(TerminalPlan {
            status,
            message,
            job_token: entry.job_token.clone(),
            remove_after: status.auto_removes().then_some(self.policy.removal_grace),
        })
    }
}
