/*
[INPUT]:  Job-tracking operations needed by queue monitors
[OUTPUT]: JobBackend trait and its HTTP implementation
[POS]:    Seam between the HTTP layer and consumers that track jobs
[UPDATE]: When queue monitors need a new backend operation
*/

use async_trait::async_trait;

use crate::http::{BackendClient, Result};
use crate::types::{CancelResponse, ContentKind, DownloadRequest, JobHandle, ProgressRecord};

/// Operations a download-queue monitor performs against the backend.
///
/// [`BackendClient`] is the production implementation; tests substitute an
/// in-memory backend.
#[async_trait]
pub trait JobBackend: Send + Sync + 'static {
    /// Start a job and return the token of its progress record.
    async fn start_download(&self, request: &DownloadRequest) -> Result<JobHandle>;

    /// Latest progress record of a job.
    async fn fetch_progress(&self, job_token: &str) -> Result<ProgressRecord>;

    /// Tokens of every job still live on the backend.
    async fn list_jobs(&self) -> Result<Vec<String>>;

    /// Remove the progress record of a finished job.
    async fn delete_job(&self, job_token: &str) -> Result<()>;

    /// Request cancellation of a running job.
    async fn cancel_download(&self, kind: ContentKind, job_token: &str) -> Result<CancelResponse>;
}

#[async_trait]
impl JobBackend for BackendClient {
    async fn start_download(&self, request: &DownloadRequest) -> Result<JobHandle> {
        BackendClient::start_download(self, request).await
    }

    async fn fetch_progress(&self, job_token: &str) -> Result<ProgressRecord> {
        self.get_job(job_token).await
    }

    async fn list_jobs(&self) -> Result<Vec<String>> {
        BackendClient::list_jobs(self).await
    }

    async fn delete_job(&self, job_token: &str) -> Result<()> {
        BackendClient::delete_job(self, job_token).await
    }

    async fn cancel_download(&self, kind: ContentKind, job_token: &str) -> Result<CancelResponse> {
        BackendClient::cancel_download(self, kind, job_token).await
    }
}
