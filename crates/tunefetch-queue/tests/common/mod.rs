/*
[INPUT]:  Scripted progress records and failure switches set by each test
[OUTPUT]: In-memory JobBackend, controller builders, record fixtures
[POS]:    Test infrastructure - shared across queue integration tests
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for tunefetch-queue tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tunefetch_adapter::{
    AdapterError, CancelResponse, ContentKind, DownloadRequest, JobBackend, JobHandle,
    ProgressRecord, ProgressStatus, Result,
};
use tunefetch_queue::{MonitorPolicy, QueueController, QueueEvent};

/// How the next start_download call should fail.
#[derive(Debug, Clone)]
pub enum StartFailure {
    Rejected(String),
    Unavailable,
}

#[derive(Default)]
struct FakeState {
    issued: u32,
    fixed_token: Option<String>,
    start_failure: Option<StartFailure>,
    scripts: HashMap<String, VecDeque<ProgressRecord>>,
    fetches: HashMap<String, usize>,
    started: Vec<DownloadRequest>,
    deleted: Vec<String>,
    cancelled: Vec<String>,
    cancel_error: Option<String>,
    listed: Vec<String>,
}

/// In-memory backend. Tokens are issued as `job-1`, `job-2`, ...
///
/// Each token replays its scripted records in order and keeps returning the
/// last one; unscripted tokens answer 404.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().expect("fake backend lock");
        f(&mut state)
    }

    pub fn script(&self, job_token: &str, records: impl IntoIterator<Item = ProgressRecord>) {
        self.with_state(|state| {
            state
                .scripts
                .entry(job_token.to_string())
                .or_default()
                .extend(records);
        });
    }

    /// Replace whatever a token would return next.
    pub fn set_progress(&self, job_token: &str, record: ProgressRecord) {
        self.with_state(|state| {
            state
                .scripts
                .insert(job_token.to_string(), VecDeque::from([record]));
        });
    }

    pub fn always_issue(&self, job_token: &str) {
        self.with_state(|state| state.fixed_token = Some(job_token.to_string()));
    }

    pub fn fail_next_start(&self, failure: StartFailure) {
        self.with_state(|state| state.start_failure = Some(failure));
    }

    pub fn fail_cancels(&self, reason: &str) {
        self.with_state(|state| state.cancel_error = Some(reason.to_string()));
    }

    pub fn list(&self, tokens: &[&str]) {
        self.with_state(|state| state.listed = tokens.iter().map(|t| t.to_string()).collect());
    }

    pub fn fetch_count(&self, job_token: &str) -> usize {
        self.with_state(|state| state.fetches.get(job_token).copied().unwrap_or(0))
    }

    pub fn started(&self) -> Vec<DownloadRequest> {
        self.with_state(|state| state.started.clone())
    }

    pub fn deleted(&self) -> Vec<String> {
        self.with_state(|state| state.deleted.clone())
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.with_state(|state| state.cancelled.clone())
    }
}

#[async_trait]
impl JobBackend for FakeBackend {
    async fn start_download(&self, request: &DownloadRequest) -> Result<JobHandle> {
        self.with_state(|state| {
            match state.start_failure.take() {
                Some(StartFailure::Rejected(message)) => {
                    return Err(AdapterError::Api {
                        status: 400,
                        message,
                    });
                }
                Some(StartFailure::Unavailable) => {
                    return Err(AdapterError::Api {
                        status: 503,
                        message: "backend busy".to_string(),
                    });
                }
                None => {}
            }
            state.started.push(request.clone());
            state.issued += 1;
            let job_token = state
                .fixed_token
                .clone()
                .unwrap_or_else(|| format!("job-{}", state.issued));
            Ok(JobHandle { job_token })
        })
    }

    async fn fetch_progress(&self, job_token: &str) -> Result<ProgressRecord> {
        self.with_state(|state| {
            *state.fetches.entry(job_token.to_string()).or_default() += 1;
            let script = state
                .scripts
                .get_mut(job_token)
                .filter(|script| !script.is_empty())
                .ok_or_else(|| AdapterError::NotFound {
                    resource: format!("/api/jobs/{job_token}"),
                })?;
            let record = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            record.ok_or_else(|| AdapterError::InvalidResponse("empty script".to_string()))
        })
    }

    async fn list_jobs(&self) -> Result<Vec<String>> {
        Ok(self.with_state(|state| state.listed.clone()))
    }

    async fn delete_job(&self, job_token: &str) -> Result<()> {
        self.with_state(|state| state.deleted.push(job_token.to_string()));
        Ok(())
    }

    async fn cancel_download(&self, _kind: ContentKind, job_token: &str) -> Result<CancelResponse> {
        self.with_state(|state| match &state.cancel_error {
            Some(reason) => Ok(CancelResponse {
                status: "error".to_string(),
                error: Some(reason.clone()),
            }),
            None => {
                state.cancelled.push(job_token.to_string());
                Ok(CancelResponse {
                    status: "cancel".to_string(),
                    error: None,
                })
            }
        })
    }
}

pub fn controller(backend: &Arc<FakeBackend>) -> QueueController<FakeBackend> {
    QueueController::new(Arc::clone(backend), MonitorPolicy::default())
}

pub fn initializing(name: &str) -> ProgressRecord {
    ProgressRecord::new(ProgressStatus::Initializing)
        .with_kind(ContentKind::Track)
        .with_name(name)
}

pub fn track_progress(song: &str, percentage: f64) -> ProgressRecord {
    ProgressRecord::new(ProgressStatus::Progress {
        current_track: None,
        total_tracks: None,
        percentage: Some(percentage),
    })
    .with_kind(ContentKind::Track)
    .with_song(song)
}

pub fn done(name: &str) -> ProgressRecord {
    ProgressRecord::new(ProgressStatus::Done)
        .with_kind(ContentKind::Track)
        .with_name(name)
}

pub fn failed(message: &str) -> ProgressRecord {
    ProgressRecord::new(ProgressStatus::Error {
        message: Some(message.to_string()),
    })
    .with_kind(ContentKind::Track)
}

/// Let the paused clock run forward, firing every timer due on the way.
pub async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Events received so far, without waiting.
pub fn drain(events: &mut broadcast::Receiver<QueueEvent>) -> Vec<QueueEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}
