/*
[INPUT]:  Raw progress record JSON written by the backend job engine
[OUTPUT]: ProgressRecord sum type keyed by `status`, decoded once at the poll boundary
[POS]:    Data layer - job progress payloads
[UPDATE]: When the backend adds status values or status-specific fields
*/

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::enums::ContentKind;

/// One snapshot of a job's progress as reported by `GET /api/jobs/{token}`.
///
/// Display metadata sits next to the status; status-specific payload lives
/// in [`ProgressStatus`]. Equality is structural and drives change detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProgressRecord")]
pub struct ProgressRecord {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(flatten)]
    pub status: ProgressStatus,
}

/// Status vocabulary of progress records with the fields each status carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum ProgressStatus {
    #[serde(rename = "queued")]
    Queued,
    #[serde(rename = "initializing")]
    Initializing,
    #[serde(rename = "downloading")]
    Downloading,
    #[serde(rename = "progress")]
    Progress {
        current_track: Option<u32>,
        total_tracks: Option<u32>,
        percentage: Option<f64>,
    },
    #[serde(rename = "real-time")]
    RealTime {
        time_elapsed: Option<u64>,
        percentage: Option<f64>,
    },
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "retrying")]
    Retrying {
        retry_count: Option<u32>,
        seconds_left: Option<u64>,
        error: Option<String>,
    },
    #[serde(rename = "done")]
    Done,
    #[serde(rename = "error")]
    Error { message: Option<String> },
    #[serde(rename = "cancel")]
    Cancelled,
    #[serde(rename = "skipped")]
    Skipped { reason: Option<String> },
    #[serde(rename = "unknown")]
    Unknown,
}

/// Wire shape of a progress record before the status is resolved.
///
/// Overlapping keys (`message`/`error`, `percentage`/`percent`/`progress`)
/// may appear together. Each is read on its own and merged on conversion.
#[derive(Debug, Default, Deserialize)]
struct RawProgressRecord {
    #[serde(rename = "type", default, deserialize_with = "lenient_kind")]
    kind: Option<ContentKind>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    song: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    artist: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    album: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    owner: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    current_track: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    total_tracks: Option<u32>,
    #[serde(default, deserialize_with = "lenient_f64")]
    percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    progress: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    time_elapsed: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    retry_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u64")]
    seconds_left: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    error: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    reason: Option<String>,
}

impl From<RawProgressRecord> for ProgressRecord {
    fn from(raw: RawProgressRecord) -> Self {
        let percentage = raw.percentage.or(raw.percent).or(raw.progress);
        let label = raw
            .status
            .as_deref()
            .map(|status| status.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let status = match label.as_str() {
            "queued" => ProgressStatus::Queued,
            "initializing" => ProgressStatus::Initializing,
            "downloading" => ProgressStatus::Downloading,
            "progress" => ProgressStatus::Progress {
                current_track: raw.current_track,
                total_tracks: raw.total_tracks,
                percentage,
            },
            "real-time" | "real_time" | "realtime" => ProgressStatus::RealTime {
                time_elapsed: raw.time_elapsed,
                percentage,
            },
            "processing" => ProgressStatus::Processing,
            "retrying" => ProgressStatus::Retrying {
                retry_count: raw.retry_count,
                seconds_left: raw.seconds_left,
                error: raw.error.or(raw.message),
            },
            "done" | "completed" | "complete" => ProgressStatus::Done,
            "error" => ProgressStatus::Error {
                message: raw.message.or(raw.error),
            },
            "cancel" | "cancelled" | "canceled" => ProgressStatus::Cancelled,
            "skipped" => ProgressStatus::Skipped {
                reason: raw.reason.or(raw.message),
            },
            _ => ProgressStatus::Unknown,
        };

        Self {
            kind: raw.kind,
            name: raw.name,
            song: raw.song,
            artist: raw.artist,
            album: raw.album,
            owner: raw.owner,
            status,
        }
    }
}

impl ProgressStatus {
    /// Wire name of the status.
    pub fn label(&self) -> &'static str {
        match self {
            ProgressStatus::Queued => "queued",
            ProgressStatus::Initializing => "initializing",
            ProgressStatus::Downloading => "downloading",
            ProgressStatus::Progress { .. } => "progress",
            ProgressStatus::RealTime { .. } => "real-time",
            ProgressStatus::Processing => "processing",
            ProgressStatus::Retrying { .. } => "retrying",
            ProgressStatus::Done => "done",
            ProgressStatus::Error { .. } => "error",
            ProgressStatus::Cancelled => "cancel",
            ProgressStatus::Skipped { .. } => "skipped",
            ProgressStatus::Unknown => "unknown",
        }
    }

    /// Statuses after which the backend writes no further records.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressStatus::Done
                | ProgressStatus::Error { .. }
                | ProgressStatus::Cancelled
                | ProgressStatus::Skipped { .. }
        )
    }

    pub fn percentage(&self) -> Option<f64> {
        match self {
            ProgressStatus::Progress { percentage, .. }
            | ProgressStatus::RealTime { percentage, .. } => *percentage,
            _ => None,
        }
    }
}

impl ProgressRecord {
    pub fn new(status: ProgressStatus) -> Self {
        Self {
            kind: None,
            name: None,
            song: None,
            artist: None,
            album: None,
            owner: None,
            status,
        }
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_song(mut self, song: impl Into<String>) -> Self {
        self.song = Some(song.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Whether the record is addressed to a job of `kind`.
    ///
    /// Records without a declared type are treated as aggregate records for
    /// whichever job owns the token.
    pub fn addressed_to(&self, kind: ContentKind) -> bool {
        self.kind.is_none_or(|declared| declared == kind)
    }

    /// Best title available for display: song, then name, then album.
    pub fn title(&self) -> Option<&str> {
        self.song
            .as_deref()
            .or(self.name.as_deref())
            .or(self.album.as_deref())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<Option<ContentKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<ContentKind>().ok()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(raw),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from_value)
        .and_then(|number| u32::try_from(number as u64).ok()))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value).map(|number| number as u64))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Accepts `3`, `3.5`, `"3"`, `"42.5%"` and `"3/12"` (leading component).
fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|n| *n >= 0.0),
        Value::String(raw) => {
            let head = raw.split('/').next().unwrap_or_default();
            head.trim()
                .trim_end_matches('%')
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite() && *n >= 0.0)
        }
        _ => None,
    }
}
