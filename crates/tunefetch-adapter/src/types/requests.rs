/*
[INPUT]:  Backend API schema definitions and caller-supplied job parameters
[OUTPUT]: Typed Rust request structs with query-string encoding
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

use super::enums::ContentKind;

/// Everything needed to start (and later restart) one download job.
///
/// The kind selects the endpoint; the remaining fields travel as query
/// parameters of `GET /api/{kind}/download`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub kind: ContentKind,
    /// Source reference (a link or service-specific identifier).
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_quality: Option<String>,
    #[serde(default)]
    pub real_time: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

impl DownloadRequest {
    pub fn new(kind: ContentKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            main_account: None,
            fallback_account: None,
            quality: None,
            fallback_quality: None,
            real_time: false,
            name: None,
            artist: None,
        }
    }

    /// Query parameters in the order the backend documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("url", self.url.clone())];
        if let Some(main) = &self.main_account {
            params.push(("main", main.clone()));
        }
        if let Some(fallback) = &self.fallback_account {
            params.push(("fallback", fallback.clone()));
        }
        if let Some(quality) = &self.quality {
            params.push(("quality", quality.clone()));
        }
        if let Some(fallback_quality) = &self.fallback_quality {
            params.push(("fall_quality", fallback_quality.clone()));
        }
        if self.real_time {
            params.push(("real_time", "true".to_string()));
        }
        if let Some(name) = &self.name {
            params.push(("name", name.clone()));
        }
        if let Some(artist) = &self.artist {
            params.push(("artist", artist.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request_only_sends_url() {
        let request = DownloadRequest::new(ContentKind::Track, "https://example.com/track/1");
        assert_eq!(
            request.query_pairs(),
            vec![("url", "https://example.com/track/1".to_string())]
        );
    }

    #[test]
    fn test_full_request_query_pairs() {
        let mut request = DownloadRequest::new(ContentKind::Album, "album-42");
        request.main_account = Some("primary".to_string());
        request.fallback_account = Some("backup".to_string());
        request.quality = Some("FLAC".to_string());
        request.fallback_quality = Some("HIGH".to_string());
        request.real_time = true;
        request.name = Some("Blue Train".to_string());
        request.artist = Some("John Coltrane".to_string());

        let pairs = request.query_pairs();
        let keys: Vec<&str> = pairs.iter().map(|(key, _)| *key).collect();
        assert_eq!(
            keys,
            vec!["url", "main", "fallback", "quality", "fall_quality", "real_time", "name", "artist"]
        );
        assert!(pairs.contains(&("real_time", "true".to_string())));
    }
}
