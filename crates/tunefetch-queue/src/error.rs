/*
[INPUT]:  Store conflicts, backend adapter failures, invalid user actions
[OUTPUT]: QueueError surfaced synchronously to queue callers
[POS]:    Error handling layer - queue operation failures
[UPDATE]: When adding queue operations with new failure modes
*/

use std::time::Duration;
use thiserror::Error;
use tunefetch_adapter::AdapterError;

use crate::entry::{TaskId, TaskStatus};

/// Failures of user-facing queue operations.
///
/// Steady-state polling failures never appear here; the polling driver folds
/// them into inactivity.
#[derive(Error, Debug)]
pub enum QueueError {
    /// A live entry already tracks this job token
    #[error("job token already tracked: {job_token}")]
    DuplicateToken { job_token: String },

    /// No entry with this id
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Backend rejected the source reference, or it was empty
    #[error("invalid source reference: {0}")]
    InvalidReference(String),

    /// Backend could not be reached or failed to start the job
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[source] AdapterError),

    /// Retry requested for an entry that did not fail
    #[error("task {id} cannot be retried in status {status}")]
    NotRetryable { id: TaskId, status: TaskStatus },

    /// Backend did not acknowledge a cancel request; the entry keeps polling
    #[error("cancel failed for task {id}: {reason}")]
    CancelFailed { id: TaskId, reason: String },

    /// Configuration invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Drivers and cleanup tasks were still running at the shutdown deadline
    #[error("shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

impl QueueError {
    /// Classify a failed enqueue call.
    pub(crate) fn from_enqueue(err: AdapterError) -> Self {
        if err.is_client_error() {
            let reason = match &err {
                AdapterError::Api { message, .. } => message.clone(),
                other => other.to_string(),
            };
            QueueError::InvalidReference(reason)
        } else {
            QueueError::BackendUnavailable(err)
        }
    }
}

/// Result type alias for queue operations
pub type Result<T> = std::result::Result<T, QueueError>;
