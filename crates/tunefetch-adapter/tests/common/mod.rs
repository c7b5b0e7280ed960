/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for tunefetch-adapter tests

use tunefetch_adapter::{BackendClient, ClientConfig};
use std::time::Duration;
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Client pointed at the mock server with a short timeout
pub fn client_for(server: &MockServer) -> BackendClient {
    let config = ClientConfig {
        timeout: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(1),
    };
    BackendClient::with_config_and_base_url(config, &server.uri()).expect("client init")
}

/// Progress record JSON as the backend writes it mid-download
pub fn downloading_track_json(song: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "track",
        "song": song,
        "artist": "Test Artist",
        "status": "downloading"
    })
}
