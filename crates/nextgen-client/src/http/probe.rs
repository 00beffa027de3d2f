/*
[INPUT]:  Configured service address
[OUTPUT]: Classified reachability and health results (never errors)
[POS]:    HTTP layer - diagnostic probe endpoints
[UPDATE]: When probe endpoints, timeouts, or result messages change
*/

use std::error::Error as StdError;
use std::time::Instant;

use reqwest::Method;
use tracing::debug;

use crate::http::{FailureKind, NextgenClient, NextgenError};
use crate::types::{HealthResult, HealthSummary, PingResult};

impl NextgenClient {
    /// Check that something answers at the base address
    ///
    /// GET /
    ///
    /// Any HTTP status counts as reachable.
    pub async fn ping(&self) -> PingResult {
        let started = Instant::now();
        let builder = match self.request(Method::GET, "") {
            Ok(builder) => builder.timeout(self.config().probe_timeout),
            Err(err) => return PingResult::failed(err.user_message(), Some(err.to_string())),
        };

        let result = match self.execute(builder).await {
            Ok(response) => {
                let status = response.status();
                PingResult::ok(
                    format!("Server reachable (HTTP {})", status.as_u16()),
                    Some(format!(
                        "{} answered in {} ms",
                        self.base_url(),
                        started.elapsed().as_millis()
                    )),
                )
            }
            Err(err) => PingResult::failed(classified_message(&err), Some(error_detail(&err))),
        };

        debug!(success = result.success, message = %result.message, "ping finished");
        result
    }

    /// Query the service health endpoint
    ///
    /// GET /health
    pub async fn health(&self) -> HealthResult {
        let builder = match self.request(Method::GET, "health") {
            Ok(builder) => builder.timeout(self.config().probe_timeout),
            Err(err) => return HealthResult::failed(err.user_message()),
        };

        let response = match self.execute(builder).await {
            Ok(response) => response,
            Err(err) => return HealthResult::failed(classified_message(&err)),
        };

        let status = response.status();
        if !status.is_success() {
            return HealthResult::failed(FailureKind::BadResponse(status.as_u16()).message());
        }

        let body = match self.read_body(response).await {
            Ok(body) => body,
            Err(err) => return HealthResult::failed(classified_message(&err)),
        };
        let data: serde_json::Value = match serde_json::from_slice(&body) {
            Ok(data) => data,
            Err(err) => return HealthResult::failed(NextgenError::from(err).user_message()),
        };

        let summary: HealthSummary = serde_json::from_value(data.clone()).unwrap_or_default();
        let result = if summary.is_unhealthy() {
            HealthResult {
                success: false,
                message: summary
                    .message
                    .unwrap_or_else(|| "Service reports unhealthy".to_string()),
                data: Some(data),
            }
        } else {
            HealthResult {
                success: true,
                message: "Service healthy".to_string(),
                data: Some(data),
            }
        };

        debug!(success = result.success, message = %result.message, "health check finished");
        result
    }
}

fn classified_message(err: &NextgenError) -> String {
    err.failure_kind()
        .map(|kind| kind.message())
        .unwrap_or_else(|| err.user_message())
}

fn error_detail(err: &NextgenError) -> String {
    let mut detail = err.to_string();
    let mut source = StdError::source(err);
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

#[cfg(test)]
mod tests {
    use crate::http::{ClientConfig, NextgenClient};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_ping_accepts_any_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = NextgenClient::new(&server.uri()).expect("client init");
        let result = client.ping().await;

        assert!(result.success);
        assert_eq!(result.message, "Server reachable (HTTP 404)");
    }

    #[tokio::test]
    async fn test_ping_times_out_with_receive_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let config = ClientConfig {
            probe_timeout: Duration::from_millis(200),
            ..ClientConfig::default()
        };
        let client = NextgenClient::with_config(config, &server.uri()).expect("client init");
        let result = client.ping().await;

        assert!(!result.success);
        assert_eq!(result.message, "Waiting for the server response timed out");
    }

    #[tokio::test]
    async fn test_health_healthy() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "healthy",
                "worker": { "is_running": true, "queue_size": 0 },
                "model": { "is_ready": true },
            })))
            .mount(&server)
            .await;

        let client = NextgenClient::new(&server.uri()).expect("client init");
        let result = client.health().await;

        assert!(result.success);
        assert_eq!(result.message, "Service healthy");
        let data = result.data.expect("payload");
        assert_eq!(data["worker"]["queue_size"], 0);
    }

    #[tokio::test]
    async fn test_health_unhealthy_keeps_payload() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "unhealthy",
                "message": "GPU thread is not running",
            })))
            .mount(&server)
            .await;

        let client = NextgenClient::new(&server.uri()).expect("client init");
        let result = client.health().await;

        assert!(!result.success);
        assert_eq!(result.message, "GPU thread is not running");
        assert!(result.data.is_some());
    }

    #[tokio::test]
    async fn test_health_bad_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = NextgenClient::new(&server.uri()).expect("client init");
        let result = client.health().await;

        assert!(!result.success);
        assert_eq!(result.message, "Server responded with status 502");
        assert!(result.data.is_none());
    }
}
