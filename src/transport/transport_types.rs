//! Transport types
//!
//! Common types shared across transport implementations: the outbound
//! request hooks may rewrite, the byte stream a transport hands back, and
//! the error taxonomy for anything that goes wrong below the frame layer.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Raw response body, delivered in whatever batches the network produces
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Network error (connection refused, reset, dropped mid-stream)
    #[error("Network error: {0}")]
    Network(String),

    /// Request or body read exceeded the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// HTTP error (non-2xx status)
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// Body could not be read as a stream
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Transport could not be built from configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TransportError {
    /// Whether this failure is the timeout sentinel
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            TransportError::Stream(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Request body plus per-request headers, ready to send
///
/// Produced by a [`crate::request::RequestBuilder`], then handed to every
/// registered pre-request hook before it reaches the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// JSON request body
    pub body: serde_json::Value,
    /// Extra headers for this request only
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl OutboundRequest {
    /// Create request from a JSON body
    pub fn new(body: serde_json::Value) -> Self {
        Self {
            body,
            headers: BTreeMap::new(),
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Asynchronous streaming transport
///
/// Abstraction over the HTTP client so the chat loop can be driven by
/// [`super::FakeTransport`] in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the response body as a byte stream
    ///
    /// A non-success status is an error here, never an empty stream.
    async fn send(&self, request: &OutboundRequest) -> Result<ByteStream, TransportError>;
}
