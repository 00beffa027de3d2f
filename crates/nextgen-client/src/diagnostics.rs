/*
[INPUT]:  EndpointConfig (current or candidate address)
[OUTPUT]: DiagnosticReport combining ping and health probes
[POS]:    Diagnostics layer - user-facing connectivity troubleshooting
[UPDATE]: When adding probes or changing report fields
*/

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::endpoint::{EndpointConfig, base_url_for, normalize_address};
use crate::http::NextgenClient;
use crate::types::{HealthResult, PingResult};

/// Snapshot of one troubleshooting run.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub address: String,
    pub base_url: String,
    pub ping: PingResult,
    pub health: HealthResult,
    pub checked_at: DateTime<Utc>,
}

impl DiagnosticReport {
    pub fn is_healthy(&self) -> bool {
        self.ping.success && self.health.success
    }

    /// Short multi-line text for display.
    pub fn summary(&self) -> String {
        let mark = |ok: bool| if ok { "ok" } else { "FAILED" };
        let mut lines = vec![
            format!("server:  {}", self.base_url),
            format!("ping:    {} - {}", mark(self.ping.success), self.ping.message),
        ];
        if let Some(detail) = &self.ping.detail {
            lines.push(format!("         {detail}"));
        }
        lines.push(format!(
            "health:  {} - {}",
            mark(self.health.success),
            self.health.message
        ));
        lines.join("\n")
    }
}

/// Runs probes against the configured address, or a candidate one.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    endpoint: Arc<EndpointConfig>,
}

impl Diagnostics {
    pub fn new(endpoint: Arc<EndpointConfig>) -> Self {
        Self { endpoint }
    }

    /// Probe the currently configured address.
    pub async fn run(&self) -> DiagnosticReport {
        let client = self.endpoint.client();
        probe(self.endpoint.address(), &client).await
    }

    /// Probe an address the user typed without saving it.
    pub async fn probe_address(&self, input: &str) -> DiagnosticReport {
        let Some(address) = normalize_address(input) else {
            return unusable(String::new(), "No server address entered");
        };

        match NextgenClient::with_config(
            self.endpoint.client_config().clone(),
            &base_url_for(&address),
        ) {
            Ok(client) => probe(address, &client).await,
            Err(err) => unusable(address, &err.user_message()),
        }
    }
}

async fn probe(address: String, client: &NextgenClient) -> DiagnosticReport {
    let (ping, health) = tokio::join!(client.ping(), client.health());
    let report = DiagnosticReport {
        base_url: base_url_for(&address),
        address,
        ping,
        health,
        checked_at: Utc::now(),
    };
    info!(
        base_url = %report.base_url,
        ping = report.ping.success,
        health = report.health.success,
        "diagnostics finished"
    );
    report
}

fn unusable(address: String, message: &str) -> DiagnosticReport {
    DiagnosticReport {
        base_url: if address.is_empty() {
            String::new()
        } else {
            base_url_for(&address)
        },
        address,
        ping: PingResult::failed(message, None),
        health: HealthResult::failed(message),
        checked_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::MemorySettingsStore;
    use crate::http::ClientConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn diagnostics() -> (Arc<EndpointConfig>, Diagnostics) {
        let endpoint = Arc::new(
            EndpointConfig::new(Arc::new(MemorySettingsStore::new()), ClientConfig::default())
                .unwrap(),
        );
        (endpoint.clone(), Diagnostics::new(endpoint))
    }

    #[tokio::test]
    async fn test_run_against_healthy_service() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "healthy",
            })))
            .mount(&server)
            .await;

        let (endpoint, diagnostics) = diagnostics();
        endpoint.set_address(&server.uri()).unwrap();

        let report = diagnostics.run().await;
        assert!(report.is_healthy());
        assert_eq!(report.base_url, server.uri());
        assert!(report.summary().contains("health:  ok - Service healthy"));
    }

    #[tokio::test]
    async fn test_probe_address_does_not_persist() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let (endpoint, diagnostics) = diagnostics();
        let before = endpoint.address();

        let report = diagnostics.probe_address(&server.uri()).await;
        assert!(report.ping.success);
        assert_eq!(endpoint.address(), before);
    }

    #[tokio::test]
    async fn test_probe_address_rejects_empty_and_invalid_input() {
        let (_endpoint, diagnostics) = diagnostics();

        let report = diagnostics.probe_address("   ").await;
        assert!(!report.is_healthy());
        assert_eq!(report.ping.message, "No server address entered");

        let report = diagnostics.probe_address("bad host:1").await;
        assert!(!report.ping.success);
        assert_eq!(report.health.message, "Server address is invalid");
    }
}
