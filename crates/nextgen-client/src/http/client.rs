/*
[INPUT]:  HTTP configuration (base URL, timeouts)
[OUTPUT]: Configured reqwest client bound to one service address
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::http::{NextgenError, Result};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Whole-request budget for ping and health probes
    pub probe_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP client for one generation service address.
///
/// A client never changes its base URL. Reconfiguration builds a new one and
/// calls [`NextgenClient::invalidate`] on the old instance, which cancels any
/// request still running on it.
#[derive(Debug)]
pub struct NextgenClient {
    http_client: Client,
    base_url: Url,
    config: ClientConfig,
    invalidated: CancellationToken,
}

impl NextgenClient {
    /// Create a new client with default configuration
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::default(), base_url)
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig, base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| NextgenError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http_client,
            base_url: parse_base_url(base_url)?,
            config,
            invalidated: CancellationToken::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Cancel in-flight requests and refuse new ones.
    pub fn invalidate(&self) {
        self.invalidated.cancel();
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated.is_cancelled()
    }

    /// Join a service-relative resource path (e.g. `images/1.png`) to the base
    /// URL. Absolute http(s) URLs are returned unchanged.
    pub fn resolve_resource_url(&self, path: &str) -> String {
        let path = path.trim();
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        match self.base_url.join(path.trim_start_matches('/')) {
            Ok(url) => url.to_string(),
            Err(_) => format!(
                "{}/{}",
                self.base_url.as_str().trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
        }
    }

    /// Build full URL for a service endpoint
    fn endpoint_url(&self, endpoint: &str) -> std::result::Result<Url, url::ParseError> {
        self.base_url.join(endpoint.trim_start_matches('/'))
    }

    /// Build request builder for a service endpoint
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.endpoint_url(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Send a request, racing it against invalidation. Any status is accepted.
    pub(crate) async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        if self.invalidated.is_cancelled() {
            return Err(NextgenError::cancelled());
        }
        let request = builder
            .build()
            .map_err(NextgenError::from_transport)?;
        debug!(method = %request.method(), url = %request.url(), "sending request");

        tokio::select! {
            _ = self.invalidated.cancelled() => Err(NextgenError::cancelled()),
            result = self.http_client.execute(request) => {
                result.map_err(NextgenError::from_transport)
            }
        }
    }

    /// Read the full response body, racing it against invalidation.
    pub(crate) async fn read_body(&self, response: Response) -> Result<Vec<u8>> {
        tokio::select! {
            _ = self.invalidated.cancelled() => Err(NextgenError::cancelled()),
            result = response.bytes() => result
                .map(|bytes| bytes.to_vec())
                .map_err(NextgenError::from_transport),
        }
    }

    /// Send a request and decode a 2xx JSON body into `T`.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.execute(builder).await?;
        let status = response.status();
        let body = self.read_body(response).await?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            debug!(status = status.as_u16(), %body, "service returned error status");
            return Err(NextgenError::Server {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Parse a base URL so that relative joins append to its path.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(NextgenError::Config(format!("not a usable base URL: {raw}")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join_keeps_base_path() {
        let client = NextgenClient::new("http://10.0.0.2:58732/api").expect("client init");
        assert_eq!(client.base_url().as_str(), "http://10.0.0.2:58732/api/");
        assert_eq!(
            client.endpoint_url("/tasks").unwrap().as_str(),
            "http://10.0.0.2:58732/api/tasks"
        );
    }

    #[test]
    fn test_resolve_resource_url() {
        let client = NextgenClient::new("http://192.168.1.5:9000").expect("client init");
        assert_eq!(
            client.resolve_resource_url("images/1.png"),
            "http://192.168.1.5:9000/images/1.png"
        );
        assert_eq!(
            client.resolve_resource_url("/out/1.png"),
            "http://192.168.1.5:9000/out/1.png"
        );
        assert_eq!(
            client.resolve_resource_url("https://cdn.example.com/1.png"),
            "https://cdn.example.com/1.png"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            NextgenClient::new("not a url"),
            Err(NextgenError::UrlParse(_))
        ));
        assert!(matches!(
            NextgenClient::new("mailto:someone@example.com"),
            Err(NextgenError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_invalidated_client_refuses_requests() {
        let client = NextgenClient::new("http://127.0.0.1:9").expect("client init");
        client.invalidate();
        assert!(client.is_invalidated());

        let builder = client.request(Method::GET, "tasks").unwrap();
        let err = client.execute(builder).await.unwrap_err();
        assert_eq!(err.failure_kind(), Some(crate::http::FailureKind::Cancelled));
    }
}
