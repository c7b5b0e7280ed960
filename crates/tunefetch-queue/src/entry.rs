/*
[INPUT]:  Download requests, job tokens from the backend, reconciled job metadata
[OUTPUT]: TaskEntry value objects and their lifecycle status
[POS]:    Domain layer - one tracked download job
[UPDATE]: When tracked job fields or lifecycle states change
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;
use tunefetch_adapter::{ContentKind, DownloadRequest, ProgressRecord};
use uuid::Uuid;

/// Placeholder title for jobs discovered on the backend without local metadata.
pub const UNKNOWN_NAME: &str = "Unknown";
/// Placeholder artist for jobs discovered on the backend without local metadata.
pub const UNKNOWN_ARTIST: &str = "-";

/// Process-local identifier of a tracked entry (never the backend job token).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Time-ordered id with a random tail (UUIDv7).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Client-side lifecycle of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Queued,
    Initializing,
    Downloading,
    Processing,
    Retrying,
    Completed,
    Error,
    Cancelled,
    Skipped,
    Timeout,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Initializing => "initializing",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Processing => "processing",
            TaskStatus::Retrying => "retrying",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Skipped => "skipped",
            TaskStatus::Timeout => "timeout",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed
                | TaskStatus::Error
                | TaskStatus::Cancelled
                | TaskStatus::Skipped
                | TaskStatus::Timeout
        )
    }

    /// Timeout displays and retries exactly like a backend error.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Error | TaskStatus::Timeout)
    }

    /// Terminal statuses that leave the queue on their own after a grace period.
    pub fn auto_removes(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Cancelled | TaskStatus::Skipped
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort display metadata supplied by the caller of enqueue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub name: Option<String>,
    pub artist: Option<String>,
}

impl EntryMetadata {
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            artist: Some(artist.into()),
        }
    }
}

/// One tracked job.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    pub id: TaskId,
    pub job_token: String,
    pub kind: ContentKind,
    /// `false` while `kind` is only a guess for an adopted job; the first
    /// collection-typed record then decides it.
    pub kind_confirmed: bool,
    pub display_name: String,
    pub display_artist: String,
    pub status: TaskStatus,
    /// Last record applied to this entry.
    pub last_progress: Option<ProgressRecord>,
    /// Last record seen for this token, applied or not.
    pub last_observed: Option<ProgressRecord>,
    /// Last time the observed progress changed (not the last poll).
    pub last_updated_at: Instant,
    pub has_ended: bool,
    pub real_time: bool,
    pub retry_count: Option<u32>,
    pub seconds_until_retry: Option<u64>,
    /// Last formatted display line.
    pub message: Option<String>,
    /// Original parameters; absent for jobs adopted from the backend at startup.
    pub request: Option<DownloadRequest>,
    pub created_at: DateTime<Utc>,
}

impl TaskEntry {
    /// Entry for a job this process just started.
    pub fn new(job_token: impl Into<String>, request: DownloadRequest, metadata: EntryMetadata) -> Self {
        let display_name = metadata
            .name
            .or_else(|| request.name.clone())
            .unwrap_or_else(|| request.url.clone());
        let display_artist = metadata
            .artist
            .or_else(|| request.artist.clone())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        Self {
            id: TaskId::generate(),
            job_token: job_token.into(),
            kind: request.kind,
            kind_confirmed: true,
            display_name,
            display_artist,
            status: TaskStatus::Queued,
            last_progress: None,
            last_observed: None,
            last_updated_at: Instant::now(),
            has_ended: false,
            real_time: request.real_time,
            retry_count: None,
            seconds_until_retry: None,
            message: None,
            request: Some(request),
            created_at: Utc::now(),
        }
    }

    /// Entry for a job found running on the backend without local metadata.
    ///
    /// A track-typed seed may be a sub-record of a collection job, so only a
    /// collection type settles the kind here.
    pub fn adopted(job_token: impl Into<String>, seed: Option<&ProgressRecord>) -> Self {
        let declared = seed.and_then(|record| record.kind);
        let kind_confirmed = declared.is_some_and(|kind| kind.is_collection());
        let kind = declared.unwrap_or(ContentKind::Track);
        let display_name = seed
            .and_then(|record| record.name.clone().or_else(|| record.song.clone()))
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());
        let display_artist = seed
            .and_then(|record| record.artist.clone().or_else(|| record.owner.clone()))
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        Self {
            id: TaskId::generate(),
            job_token: job_token.into(),
            kind,
            kind_confirmed,
            display_name,
            display_artist,
            status: TaskStatus::Queued,
            last_progress: None,
            last_observed: None,
            last_updated_at: Instant::now(),
            has_ended: false,
            real_time: false,
            retry_count: None,
            seconds_until_retry: None,
            message: None,
            request: None,
            created_at: Utc::now(),
        }
    }

    /// Settle a provisional kind from a record's declared type.
    ///
    /// Returns `true` when the entry switched to a collection kind.
    pub fn infer_kind(&mut self, record: &ProgressRecord) -> bool {
        if self.kind_confirmed {
            return false;
        }
        let Some(declared) = record.kind.filter(ContentKind::is_collection) else {
            return false;
        };

        self.kind = declared;
        self.kind_confirmed = true;
        if let Some(name) = &record.name {
            self.display_name = name.clone();
        }
        if let Some(artist) = record.artist.as_ref().or(record.owner.as_ref()) {
            self.display_artist = artist.clone();
        }
        true
    }

    pub fn can_retry(&self) -> bool {
        self.status.is_failure()
    }

    /// Live entries are still polled.
    pub fn is_live(&self) -> bool {
        !self.has_ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunefetch_adapter::ProgressStatus;

    #[test]
    fn test_task_ids_are_unique() {
        let first = TaskId::generate();
        let second = TaskId::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn test_new_entry_prefers_caller_metadata() {
        let mut request = DownloadRequest::new(ContentKind::Album, "album-1");
        request.name = Some("From Request".to_string());
        let entry = TaskEntry::new("tok", request, EntryMetadata::new("Giant Steps", "Coltrane"));

        assert_eq!(entry.display_name, "Giant Steps");
        assert_eq!(entry.display_artist, "Coltrane");
        assert_eq!(entry.status, TaskStatus::Queued);
        assert!(entry.is_live());
        assert!(!entry.can_retry());
    }

    #[test]
    fn test_new_entry_falls_back_to_reference() {
        let entry = TaskEntry::new(
            "tok",
            DownloadRequest::new(ContentKind::Track, "https://example.com/t/1"),
            EntryMetadata::default(),
        );
        assert_eq!(entry.display_name, "https://example.com/t/1");
        assert_eq!(entry.display_artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn test_adopted_entry_uses_placeholders() {
        let entry = TaskEntry::adopted("tok", None);
        assert_eq!(entry.display_name, UNKNOWN_NAME);
        assert_eq!(entry.display_artist, UNKNOWN_ARTIST);
        assert_eq!(entry.kind, ContentKind::Track);
        assert!(!entry.kind_confirmed);
        assert!(entry.request.is_none());
    }

    #[test]
    fn test_adopted_track_seed_stays_provisional() {
        let seed = ProgressRecord::new(ProgressStatus::Downloading)
            .with_kind(ContentKind::Track)
            .with_song("Lonnie's Lament");
        let mut entry = TaskEntry::adopted("tok", Some(&seed));
        assert_eq!(entry.kind, ContentKind::Track);
        assert!(!entry.kind_confirmed);

        let album = ProgressRecord::new(ProgressStatus::Initializing)
            .with_kind(ContentKind::Album)
            .with_name("Crescent")
            .with_artist("John Coltrane");
        assert!(entry.infer_kind(&album));
        assert_eq!(entry.kind, ContentKind::Album);
        assert!(entry.kind_confirmed);
        assert_eq!(entry.display_name, "Crescent");
        assert_eq!(entry.display_artist, "John Coltrane");

        let playlist = ProgressRecord::new(ProgressStatus::Downloading).with_kind(ContentKind::Playlist);
        assert!(!entry.infer_kind(&playlist));
        assert_eq!(entry.kind, ContentKind::Album);
    }

    #[test]
    fn test_requested_kind_is_never_inferred() {
        let mut entry = TaskEntry::new(
            "tok",
            DownloadRequest::new(ContentKind::Track, "track-1"),
            EntryMetadata::default(),
        );
        let album = ProgressRecord::new(ProgressStatus::Downloading).with_kind(ContentKind::Album);
        assert!(!entry.infer_kind(&album));
        assert_eq!(entry.kind, ContentKind::Track);
    }

    #[test]
    fn test_adopted_entry_reads_seed_metadata() {
        let seed = ProgressRecord::new(ProgressStatus::Downloading)
            .with_kind(ContentKind::Playlist)
            .with_name("Road Trip");
        let entry = TaskEntry::adopted("tok", Some(&seed));
        assert_eq!(entry.kind, ContentKind::Playlist);
        assert!(entry.kind_confirmed);
        assert_eq!(entry.display_name, "Road Trip");
    }

    #[test]
    fn test_status_classes() {
        assert!(TaskStatus::Timeout.is_failure());
        assert!(TaskStatus::Timeout.is_terminal());
        assert!(!TaskStatus::Timeout.auto_removes());
        assert!(TaskStatus::Completed.auto_removes());
        assert!(!TaskStatus::Retrying.is_terminal());
    }
}
