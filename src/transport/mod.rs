//! Transport layer
//!
//! Provider-agnostic byte transport for the chat loop. The real
//! implementation is reqwest-based; the fake one replays fixtures.

pub mod transport_fake;
pub mod transport_http;
pub mod transport_types;

pub use transport_fake::{FakeRound, FakeTransport};
pub use transport_http::{HttpTransport, DEFAULT_TIMEOUT_SECS};
pub use transport_types::{ByteStream, OutboundRequest, Transport, TransportError};
