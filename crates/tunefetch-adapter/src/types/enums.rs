/*
[INPUT]:  Backend API schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of content a download job acquires.
///
/// Doubles as the `{kind}` path segment of the download endpoints and as the
/// `type` field of progress records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Track,
    Album,
    Playlist,
    Artist,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Track,
        ContentKind::Album,
        ContentKind::Playlist,
        ContentKind::Artist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Track => "track",
            ContentKind::Album => "album",
            ContentKind::Playlist => "playlist",
            ContentKind::Artist => "artist",
        }
    }

    /// Whether a job of this kind fans out into several tracks.
    pub fn is_collection(&self) -> bool {
        !matches!(self, ContentKind::Track)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "track" => Ok(ContentKind::Track),
            "album" => Ok(ContentKind::Album),
            "playlist" => Ok(ContentKind::Playlist),
            "artist" => Ok(ContentKind::Artist),
            other => Err(format!("unknown content kind: {other}")),
        }
    }
}
