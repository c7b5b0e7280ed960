/*
[INPUT]:  Mock backend HTTP server
[OUTPUT]: Verification that the queue drives the real HTTP client end to end
[POS]:    Integration test layer - controller over BackendClient
[UPDATE]: When backend endpoints or controller wiring change
*/

use std::sync::Arc;
use std::time::Duration;
use tunefetch_adapter::{BackendClient, ClientConfig, ContentKind};
use tunefetch_queue::{
    EnqueueOptions, EntryMetadata, MonitorPolicy, QueueController, TaskId, TaskStatus,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy() -> MonitorPolicy {
    MonitorPolicy {
        poll_interval: Duration::from_millis(50),
        inactivity_timeout: Duration::from_secs(30),
        removal_grace: Duration::from_secs(30),
    }
}

async fn wait_for_status(
    queue: &QueueController<BackendClient>,
    id: &TaskId,
    expected: TaskStatus,
) -> bool {
    for _ in 0..100 {
        if queue
            .get(id)
            .await
            .is_ok_and(|entry| entry.status == expected)
        {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_queue_over_http_backend() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/album/download"))
        .and(query_param("url", "https://music.example/album/3"))
        .and(query_param("quality", "LOSSLESS"))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "prg_file": "album-3.prg"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/jobs/album-3.prg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "album",
            "name": "Ballads",
            "artist": "John Coltrane",
            "status": "done"
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/jobs/album-3.prg"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = BackendClient::with_config_and_base_url(ClientConfig::default(), &server.uri())
        .expect("client init");
    let queue = QueueController::new(Arc::new(client), fast_policy());

    let options = EnqueueOptions {
        quality: Some("LOSSLESS".to_string()),
        ..EnqueueOptions::default()
    };
    let id = queue
        .enqueue(
            ContentKind::Album,
            "https://music.example/album/3",
            EntryMetadata::default(),
            options,
        )
        .await
        .expect("enqueue");

    assert!(wait_for_status(&queue, &id, TaskStatus::Completed).await);
    let entry = queue.get(&id).await.expect("entry");
    assert_eq!(entry.job_token, "album-3.prg");
    assert_eq!(entry.message.as_deref(), Some("Finished album Ballads"));

    queue.shutdown_and_wait().await.expect("shutdown");
    server.verify().await;
}

#[tokio::test]
async fn test_cancel_over_http_backend() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/track/download"))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "job_token": "t-1"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/jobs/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "track",
            "song": "Say It",
            "status": "downloading"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/track/download/cancel"))
        .and(query_param("job_token", "t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "cancel"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/jobs/t-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = BackendClient::with_config_and_base_url(ClientConfig::default(), &server.uri())
        .expect("client init");
    let queue = QueueController::new(Arc::new(client), fast_policy());

    let id = queue
        .enqueue(
            ContentKind::Track,
            "track-1",
            EntryMetadata::default(),
            EnqueueOptions::default(),
        )
        .await
        .expect("enqueue");
    assert!(wait_for_status(&queue, &id, TaskStatus::Downloading).await);

    assert_eq!(queue.cancel(&id).await.expect("cancel"), TaskStatus::Cancelled);
    let entry = queue.get(&id).await.expect("entry");
    assert!(entry.has_ended);

    queue.shutdown_and_wait().await.expect("shutdown");
    server.verify().await;
}
