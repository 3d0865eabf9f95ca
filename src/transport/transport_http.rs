//! Real HTTP transport using reqwest
//!
//! POSTs the request body as JSON and hands the chunked response body back
//! as a byte stream. Authentication headers are supplied by the caller via
//! configuration or a pre-request hook; this layer does not resolve them.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use tracing::{debug, warn};

use crate::transport::transport_types::{ByteStream, OutboundRequest, Transport, TransportError};

/// Default timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Real HTTP transport using reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    /// Whole-request timeout, including reading the streamed body
    timeout: Duration,
    /// Headers sent with every request
    headers: BTreeMap<String, String>,
}

impl HttpTransport {
    /// Create new transport with default timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            headers: BTreeMap::new(),
        }
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace the underlying client (proxies, custom TLS roots)
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Target URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Static headers merged with the request's own; request headers win
    fn header_map(&self, request: &OutboundRequest) -> Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::new();
        for (name, value) in self.headers.iter().chain(request.headers.iter()) {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::Configuration(format!("invalid header name '{}': {}", name, e))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::Configuration(format!("invalid value for header '{}': {}", name, e))
            })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<ByteStream, TransportError> {
        debug!(url = %self.url, timeout_ms = self.timeout.as_millis() as u64, "POST stream request");

        let url = Url::parse(&self.url).map_err(|e| {
            TransportError::Configuration(format!("invalid URL '{}': {}", self.url, e))
        })?;
        let headers = self.header_map(request)?;

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .headers(headers)
            .json(&request.body)
            .send()
            .await?;
        let status = response.status();
        debug!(status = status.as_u16(), "stream response");

        if !status.is_success() {
            let message = match response.text().await {
                Ok(body) if !body.trim().is_empty() => body,
                _ => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            };
            warn!(status = status.as_u16(), %message, "non-success status");
            return Err(TransportError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed())
    }
}
