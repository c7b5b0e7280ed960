/*
[INPUT]:  ProgressRecord and the kind of the tracked entry
[OUTPUT]: One human-readable status line
[POS]:    Presentation helper - pure, stateless
[UPDATE]: When new statuses or display fields appear in progress records
*/

use std::time::Duration;
use tunefetch_adapter::{ContentKind, ProgressRecord, ProgressStatus};

/// Render a progress record as a status line for an entry of `kind`.
pub fn format_status(record: &ProgressRecord, kind: ContentKind) -> String {
    let title = record.title();
    let by_artist = record
        .artist
        .as_deref()
        .map(|artist| format!(" by {artist}"))
        .unwrap_or_default();

    match &record.status {
        ProgressStatus::Queued => match title {
            Some(title) => format!("Queued {title}"),
            None => format!("Queued {kind}"),
        },
        ProgressStatus::Initializing => match record.name.as_deref().or(title) {
            Some(name) => format!("Initializing {kind} download for {name}"),
            None => format!("Initializing {kind} download"),
        },
        ProgressStatus::Downloading => {
            format!("Downloading {}{by_artist}", title.unwrap_or("track"))
        }
        ProgressStatus::Progress {
            current_track,
            total_tracks,
            percentage,
        } => {
            let pct = percentage.map(format_percent);
            if kind.is_collection() {
                let position = match (current_track, total_tracks) {
                    (Some(current), Some(total)) => format!("track {current}/{total}"),
                    (Some(current), None) => format!("track {current}"),
                    _ => "tracks".to_string(),
                };
                let song = record
                    .song
                    .as_deref()
                    .map(|song| format!(": {song}"))
                    .unwrap_or_default();
                match pct {
                    Some(pct) => format!("Downloading {position}{song} ({pct})"),
                    None => format!("Downloading {position}{song}"),
                }
            } else {
                let title = title.unwrap_or("track");
                match pct {
                    Some(pct) => format!("Downloading {title} ({pct})"),
                    None => format!("Downloading {title}"),
                }
            }
        }
        ProgressStatus::RealTime {
            time_elapsed,
            percentage,
        } => {
            let title = title.unwrap_or("track");
            let mut details = Vec::new();
            if let Some(pct) = percentage {
                details.push(format_percent(*pct));
            }
            if let Some(elapsed) = time_elapsed {
                details.push(format!("{} elapsed", format_clock(*elapsed)));
            }
            if details.is_empty() {
                format!("Real-time download {title}")
            } else {
                format!("Real-time download {title} ({})", details.join(", "))
            }
        }
        ProgressStatus::Processing => match title {
            Some(title) => format!("Processing {title}"),
            None => "Processing".to_string(),
        },
        ProgressStatus::Retrying {
            retry_count,
            seconds_left,
            error,
        } => {
            let attempt = retry_count
                .map(|count| format!(" (attempt {count})"))
                .unwrap_or_default();
            let wait = seconds_left
                .map(|secs| format!(", next try in {secs}s"))
                .unwrap_or_default();
            let reason = error
                .as_deref()
                .map(|err| format!(": {err}"))
                .unwrap_or_default();
            format!("Retrying{attempt}{wait}{reason}")
        }
        ProgressStatus::Done => match record.name.as_deref().or(title) {
            Some(name) => format!("Finished {kind} {name}"),
            None => format!("Finished {kind}"),
        },
        ProgressStatus::Error { message } => {
            format!("Error: {}", message.as_deref().unwrap_or("unknown error"))
        }
        ProgressStatus::Cancelled => format_cancelled(),
        ProgressStatus::Skipped { reason } => {
            let title = title.unwrap_or("track");
            match reason {
                Some(reason) => format!("Skipped {title}: {reason}"),
                None => format!("Skipped {title}"),
            }
        }
        ProgressStatus::Unknown => format!("Status: {}", record.status.label()),
    }
}

/// Line shown when an entry times out for lack of progress.
pub fn format_timeout(elapsed: Duration) -> String {
    format!(
        "Download timed out after {}s without progress",
        elapsed.as_secs()
    )
}

/// Line shown once a cancel request was acknowledged.
pub fn format_cancelled() -> String {
    "Download cancelled".to_string()
}

fn format_percent(value: f64) -> String {
    format!("{:.0}%", value.clamp(0.0, 100.0))
}

fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(status: ProgressStatus) -> ProgressRecord {
        ProgressRecord::new(status)
    }

    #[test]
    fn test_downloading_track_line() {
        let line = format_status(
            &record(ProgressStatus::Downloading)
                .with_song("Naima")
                .with_artist("John Coltrane"),
            ContentKind::Track,
        );
        assert_eq!(line, "Downloading Naima by John Coltrane");
    }

    #[test]
    fn test_album_progress_line() {
        let line = format_status(
            &record(ProgressStatus::Progress {
                current_track: Some(3),
                total_tracks: Some(7),
                percentage: Some(42.4),
            })
            .with_song("Mr. P.C."),
            ContentKind::Album,
        );
        assert_eq!(line, "Downloading track 3/7: Mr. P.C. (42%)");
    }

    #[test]
    fn test_track_progress_line() {
        let line = format_status(
            &record(ProgressStatus::Progress {
                current_track: None,
                total_tracks: None,
                percentage: Some(40.0),
            })
            .with_song("Countdown"),
            ContentKind::Track,
        );
        assert_eq!(line, "Downloading Countdown (40%)");
    }

    #[test]
    fn test_real_time_line() {
        let line = format_status(
            &record(ProgressStatus::RealTime {
                time_elapsed: Some(65),
                percentage: Some(12.0),
            })
            .with_song("Alabama"),
            ContentKind::Track,
        );
        assert_eq!(line, "Real-time download Alabama (12%, 1:05 elapsed)");
    }

    #[test]
    fn test_retrying_line() {
        let line = format_status(
            &record(ProgressStatus::Retrying {
                retry_count: Some(2),
                seconds_left: Some(15),
                error: Some("rate limited".to_string()),
            }),
            ContentKind::Track,
        );
        assert_eq!(line, "Retrying (attempt 2), next try in 15s: rate limited");
    }

    #[rstest]
    #[case(ProgressStatus::Error { message: Some("region locked".to_string()) }, "Error: region locked")]
    #[case(ProgressStatus::Error { message: None }, "Error: unknown error")]
    #[case(ProgressStatus::Cancelled, "Download cancelled")]
    #[case(ProgressStatus::Initializing, "Initializing playlist download")]
    #[case(ProgressStatus::Done, "Finished playlist")]
    #[case(ProgressStatus::Unknown, "Status: unknown")]
    fn test_simple_lines(#[case] status: ProgressStatus, #[case] expected: &str) {
        assert_eq!(format_status(&record(status), ContentKind::Playlist), expected);
    }

    #[test]
    fn test_done_line_uses_name() {
        let line = format_status(
            &record(ProgressStatus::Done).with_name("Blue Train"),
            ContentKind::Album,
        );
        assert_eq!(line, "Finished album Blue Train");
    }

    #[test]
    fn test_skipped_line() {
        let line = format_status(
            &record(ProgressStatus::Skipped {
                reason: Some("already downloaded".to_string()),
            })
            .with_song("Impressions"),
            ContentKind::Track,
        );
        assert_eq!(line, "Skipped Impressions: already downloaded");
    }

    #[test]
    fn test_timeout_line() {
        assert_eq!(
            format_timeout(Duration::from_secs(182)),
            "Download timed out after 182s without progress"
        );
    }
}
