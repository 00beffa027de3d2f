/*
[INPUT]:  Error sources (HTTP transport, status codes, payload decoding, user input)
[OUTPUT]: Structured error type plus the stable failure classification shown to users
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or changing user-facing failure messages
*/

use std::error::Error as StdError;
use std::fmt;
use std::io;

use thiserror::Error;

/// Main error type for the nextgen client
#[derive(Error, Debug)]
pub enum NextgenError {
    /// Prompt was empty or whitespace; nothing was sent
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    /// Transport-level failure (timeout, refused, DNS, TLS, cancelled)
    #[error("{}", .kind.message())]
    Network {
        kind: FailureKind,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Service answered with a non-success status
    #[error("Server responded with status {status}")]
    Server { status: u16, body: String },

    /// Response payload was malformed or missing required fields
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl NextgenError {
    /// Classify a reqwest failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return NextgenError::Server {
                status: status.as_u16(),
                body: String::new(),
            };
        }
        NextgenError::Network {
            kind: FailureKind::classify(&err),
            source: Some(err),
        }
    }

    pub fn cancelled() -> Self {
        NextgenError::Network {
            kind: FailureKind::Cancelled,
            source: None,
        }
    }

    /// The taxonomy entry for this error, if it came from talking to the service.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            NextgenError::Network { kind, .. } => Some(*kind),
            NextgenError::Server { status, .. } => Some(FailureKind::BadResponse(*status)),
            _ => None,
        }
    }

    /// Text suitable for showing to the person who pressed "generate".
    pub fn user_message(&self) -> String {
        match self {
            NextgenError::EmptyPrompt => "Please enter a prompt".to_string(),
            NextgenError::Serialization(_) => "Server returned an unexpected response".to_string(),
            NextgenError::UrlParse(_) | NextgenError::Config(_) => {
                "Server address is invalid".to_string()
            }
            NextgenError::Network { kind, .. } => kind.message(),
            NextgenError::Server { status, .. } => FailureKind::BadResponse(*status).message(),
        }
    }

    /// Check if the error is worth retrying later
    pub fn is_retryable(&self) -> bool {
        match self {
            NextgenError::Network { kind, .. } => !matches!(kind, FailureKind::BadCertificate),
            NextgenError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias for nextgen operations
pub type Result<T> = std::result::Result<T, NextgenError>;

/// Why a request to the service did not produce a usable answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ConnectTimeout,
    SendTimeout,
    ReceiveTimeout,
    BadResponse(u16),
    Cancelled,
    Connection(ConnectionFailure),
    BadCertificate,
    Unknown,
}

/// Refinement of [`FailureKind::Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionFailure {
    DnsFailure,
    NetworkUnreachable,
    ConnectionRefused,
    Other,
}

impl FailureKind {
    /// Stable, user-facing message. Diagnostics screens match on these strings.
    pub fn message(&self) -> String {
        match self {
            FailureKind::ConnectTimeout => "Connection timed out".to_string(),
            FailureKind::SendTimeout => "Sending the request timed out".to_string(),
            FailureKind::ReceiveTimeout => "Waiting for the server response timed out".to_string(),
            FailureKind::BadResponse(status) => format!("Server responded with status {status}"),
            FailureKind::Cancelled => "Request was cancelled".to_string(),
            FailureKind::Connection(ConnectionFailure::DnsFailure) => {
                "Connection error: could not resolve host".to_string()
            }
            FailureKind::Connection(ConnectionFailure::NetworkUnreachable) => {
                "Connection error: network is unreachable".to_string()
            }
            FailureKind::Connection(ConnectionFailure::ConnectionRefused) => {
                "Connection error: connection refused, is the server running?".to_string()
            }
            FailureKind::Connection(ConnectionFailure::Other) => {
                "Connection error: could not reach the server".to_string()
            }
            FailureKind::BadCertificate => "TLS certificate was rejected".to_string(),
            FailureKind::Unknown => "Unknown network error".to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FailureKind::ConnectTimeout | FailureKind::SendTimeout | FailureKind::ReceiveTimeout
        )
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, FailureKind::Connection(_))
    }

    /// Classify using reqwest's flags and the `io::ErrorKind`s in the source
    /// chain. DNS and certificate failures carry no structured code in the
    /// stack, so those fall back to best-effort message inspection.
    ///
    /// Request bodies here are small buffered JSON written in one go, so a
    /// timeout after the connection is up is spent waiting on the server.
    /// `SendTimeout` is never produced by classification.
    pub fn classify(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return FailureKind::BadResponse(status.as_u16());
        }

        let io_kind = io_error_kind(err);

        if err.is_timeout() || io_kind == Some(io::ErrorKind::TimedOut) {
            if err.is_connect() {
                return FailureKind::ConnectTimeout;
            }
            return FailureKind::ReceiveTimeout;
        }

        match io_kind {
            Some(io::ErrorKind::ConnectionRefused) => {
                return FailureKind::Connection(ConnectionFailure::ConnectionRefused);
            }
            Some(io::ErrorKind::NetworkUnreachable | io::ErrorKind::HostUnreachable) => {
                return FailureKind::Connection(ConnectionFailure::NetworkUnreachable);
            }
            _ => {}
        }

        let text = error_chain_text(err);
        if let Some(kind) = sniff_message(&text) {
            return kind;
        }

        if err.is_connect() {
            FailureKind::Connection(ConnectionFailure::Other)
        } else {
            FailureKind::Unknown
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<io::ErrorKind> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        current = source.source();
    }
    None
}

fn error_chain_text(err: &(dyn StdError + 'static)) -> String {
    let mut parts = Vec::new();
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ").to_ascii_lowercase()
}

fn sniff_message(text: &str) -> Option<FailureKind> {
    const DNS_MARKERS: [&str; 5] = [
        "dns error",
        "failed to lookup address",
        "name or service not known",
        "nodename nor servname",
        "no such host",
    ];
    const CERT_MARKERS: [&str; 3] = ["certificate", "unknownissuer", "handshake failure"];

    if DNS_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Some(FailureKind::Connection(ConnectionFailure::DnsFailure));
    }
    if CERT_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Some(FailureKind::BadCertificate);
    }
    if text.contains("connection refused") {
        return Some(FailureKind::Connection(ConnectionFailure::ConnectionRefused));
    }
    if text.contains("network is unreachable") || text.contains("no route to host") {
        return Some(FailureKind::Connection(ConnectionFailure::NetworkUnreachable));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_maps_to_bad_response() {
        let err = NextgenError::Server {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(err.failure_kind(), Some(FailureKind::BadResponse(503)));
        assert_eq!(err.user_message(), "Server responded with status 503");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_user_input_error_is_not_retryable() {
        let err = NextgenError::EmptyPrompt;
        assert_eq!(err.failure_kind(), None);
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "Please enter a prompt");
    }

    #[test]
    fn test_cancelled_error_message() {
        let err = NextgenError::cancelled();
        assert_eq!(err.failure_kind(), Some(FailureKind::Cancelled));
        assert_eq!(err.to_string(), "Request was cancelled");
    }

    #[test]
    fn test_messages_are_distinct() {
        let kinds = [
            FailureKind::ConnectTimeout,
            FailureKind::SendTimeout,
            FailureKind::ReceiveTimeout,
            FailureKind::BadResponse(500),
            FailureKind::Cancelled,
            FailureKind::Connection(ConnectionFailure::DnsFailure),
            FailureKind::Connection(ConnectionFailure::NetworkUnreachable),
            FailureKind::Connection(ConnectionFailure::ConnectionRefused),
            FailureKind::Connection(ConnectionFailure::Other),
            FailureKind::BadCertificate,
            FailureKind::Unknown,
        ];
        let messages: std::collections::HashSet<String> =
            kinds.iter().map(FailureKind::message).collect();
        assert_eq!(messages.len(), kinds.len());
        assert!(
            kinds
                .iter()
                .filter(|kind| kind.is_connection_error())
                .all(|kind| kind.message().starts_with("Connection error"))
        );
    }

    #[test]
    fn test_sniff_message_fallbacks() {
        assert_eq!(
            sniff_message("error sending request: dns error: failed to lookup address information"),
            Some(FailureKind::Connection(ConnectionFailure::DnsFailure))
        );
        assert_eq!(
            sniff_message("invalid peer certificate: unknownissuer"),
            Some(FailureKind::BadCertificate)
        );
        assert_eq!(
            sniff_message("tcp connect error: connection refused (os error 111)"),
            Some(FailureKind::Connection(ConnectionFailure::ConnectionRefused))
        );
        assert_eq!(sniff_message("something else"), None);
    }

    #[tokio::test]
    async fn test_classify_refused_connection() {
        // Bind then drop to get a local port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = reqwest::get(format!("http://127.0.0.1:{port}/"))
            .await
            .expect_err("nothing listens on the port");
        assert_eq!(
            FailureKind::classify(&err),
            FailureKind::Connection(ConnectionFailure::ConnectionRefused)
        );
    }

    #[tokio::test]
    async fn test_classify_unresolvable_host() {
        // `.invalid` is reserved and never resolves.
        let err = reqwest::get("http://nextgen-host.invalid:58732/")
            .await
            .expect_err("host must not resolve");
        let kind = FailureKind::classify(&err);
        assert_eq!(kind, FailureKind::Connection(ConnectionFailure::DnsFailure));
        assert_eq!(kind.message(), "Connection error: could not resolve host");
    }
}
