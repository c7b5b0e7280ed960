/*
[INPUT]:  Download requests and job tokens
[OUTPUT]: Job handles, progress records, live job lists, cancel acknowledgements
[POS]:    HTTP layer - download job endpoints
[UPDATE]: When adding job endpoints or changing query parameters
*/

use crate::http::{BackendClient, Result};
use crate::types::{CancelResponse, ContentKind, DownloadRequest, JobHandle, ProgressRecord};
use reqwest::Method;

impl BackendClient {
    /// Start a download job
    ///
    /// GET /api/{kind}/download?url={url}&main=..&fallback=..&quality=..&fall_quality=..&real_time=..
    pub async fn start_download(&self, request: &DownloadRequest) -> Result<JobHandle> {
        let builder = self
            .request(Method::GET, &["api", request.kind.as_str(), "download"])?
            .query(&request.query_pairs());
        let handle: JobHandle = self.send_json(builder).await?;
        tracing::debug!(
            kind = %request.kind,
            job_token = %handle.job_token,
            "download job started"
        );
        Ok(handle)
    }

    /// Fetch the latest progress record of a job
    ///
    /// GET /api/jobs/{job_token}
    pub async fn get_job(&self, job_token: &str) -> Result<ProgressRecord> {
        let builder = self.request(Method::GET, &["api", "jobs", job_token])?;
        self.send_json(builder).await
    }

    /// List tokens of every job the backend still tracks
    ///
    /// GET /api/jobs/list
    pub async fn list_jobs(&self) -> Result<Vec<String>> {
        let builder = self.request(Method::GET, &["api", "jobs", "list"])?;
        self.send_json(builder).await
    }

    /// Delete the progress record of a finished job
    ///
    /// DELETE /api/jobs/{job_token}
    pub async fn delete_job(&self, job_token: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, &["api", "jobs", job_token])?;
        self.send_empty(builder).await
    }

    /// Ask the backend to cancel a running job
    ///
    /// GET /api/{kind}/download/cancel?job_token={job_token}
    pub async fn cancel_download(
        &self,
        kind: ContentKind,
        job_token: &str,
    ) -> Result<CancelResponse> {
        let builder = self
            .request(Method::GET, &["api", kind.as_str(), "download", "cancel"])?
            .query(&[("job_token", job_token)]);
        self.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use crate::http::{AdapterError, BackendClient, ClientConfig};
    use crate::types::{ContentKind, DownloadRequest, ProgressStatus};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BackendClient {
        BackendClient::with_config_and_base_url(ClientConfig::default(), &server.uri())
            .expect("client init")
    }

    #[tokio::test]
    async fn test_start_download() {
        let server = MockServer::start().await;

        let _mock = Mock::given(method("GET"))
            .and(path("/api/album/download"))
            .and(query_param("url", "https://example.com/album/1"))
            .and(query_param("quality", "FLAC"))
            .and(query_param("real_time", "true"))
            .respond_with(
                ResponseTemplate::new(202).set_body_json(serde_json::json!({
                    "job_token": "album-1.prg"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut request = DownloadRequest::new(ContentKind::Album, "https://example.com/album/1");
        request.quality = Some("FLAC".to_string());
        request.real_time = true;

        let handle = client_for(&server)
            .start_download(&request)
            .await
            .expect("start_download failed");
        assert_eq!(handle.job_token, "album-1.prg");
    }

    #[tokio::test]
    async fn test_start_download_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/track/download"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "Missing parameter: url"
            })))
            .mount(&server)
            .await;

        let request = DownloadRequest::new(ContentKind::Track, "nope");
        let err = client_for(&server)
            .start_download(&request)
            .await
            .expect_err("400 must fail");

        match err {
            AdapterError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Missing parameter: url");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_job() {
        let server = MockServer::start().await;

        let _mock = Mock::given(method("GET"))
            .and(path("/api/jobs/tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "album",
                "name": "Kind of Blue",
                "status": "progress",
                "current_track": 2,
                "total_tracks": 5,
                "percentage": 40
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = client_for(&server)
            .get_job("tok-1")
            .await
            .expect("get_job failed");

        assert_eq!(record.kind, Some(ContentKind::Album));
        assert_eq!(record.name.as_deref(), Some("Kind of Blue"));
        assert_eq!(
            record.status,
            ProgressStatus::Progress {
                current_track: Some(2),
                total_tracks: Some(5),
                percentage: Some(40.0),
            }
        );
    }

    #[tokio::test]
    async fn test_get_unknown_job_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/jobs/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_job("missing")
            .await
            .expect_err("404 must fail");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_jobs() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/jobs/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["a", "b"])))
            .mount(&server)
            .await;

        let tokens = client_for(&server).list_jobs().await.expect("list_jobs failed");
        assert_eq!(tokens, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_job() {
        let server = MockServer::start().await;

        let _mock = Mock::given(method("DELETE"))
            .and(path("/api/jobs/tok-9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .delete_job("tok-9")
            .await
            .expect("delete_job failed");
    }

    #[tokio::test]
    async fn test_cancel_download() {
        let server = MockServer::start().await;

        let _mock = Mock::given(method("GET"))
            .and(path("/api/playlist/download/cancel"))
            .and(query_param("job_token", "tok-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "cancel"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .cancel_download(ContentKind::Playlist, "tok-3")
            .await
            .expect("cancel_download failed");
        assert!(response.is_acknowledged());
    }
}
