/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for nextgen-client tests

use std::sync::Arc;

use nextgen_client::{ClientConfig, EndpointConfig, MemorySettingsStore};
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
#[allow(dead_code)]
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Endpoint pointed at `base_url`, backed by in-memory settings
#[allow(dead_code)]
pub fn endpoint_for(base_url: &str) -> Arc<EndpointConfig> {
    let endpoint = EndpointConfig::new(Arc::new(MemorySettingsStore::new()), ClientConfig::default())
        .expect("endpoint init");
    endpoint.set_address(base_url).expect("set address");
    Arc::new(endpoint)
}

/// Task JSON in the service's wire shape
#[allow(dead_code)]
pub fn task_json(id: &str, status: &str, image_url: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "prompt": format!("prompt {id}"),
        "negative_prompt": null,
        "created_at": "2024-01-01T00:00:00",
        "status": status,
        "imageUrl": image_url,
    })
}

/// A local address with nothing listening on it
#[allow(dead_code)]
pub fn refused_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("127.0.0.1:{port}")
}
