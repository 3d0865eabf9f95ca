//! agentwire: client runtime for streamed agent conversations
//!
//! Decodes the framed event stream an agent service sends back, folds it
//! into one response, and runs client-side tool callbacks across as many
//! rounds as the service asks for. Plugins contribute those callbacks and
//! are gated by a trust policy before they are registered.
//!
//! # Layers
//!
//! - [`stream`]: bytes to raw frames, both wire formats
//! - [`events`]: raw frames to typed events
//! - [`aggregate`]: typed events to one response
//! - [`plugins`]: bundles, validation, trust, registry
//! - [`chat_loop`]: the multi-round driver

pub mod aggregate;
pub mod chat_loop;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod observer;
pub mod plugins;
pub mod request;
pub mod stream;
pub mod transport;

// Re-export the main entry points
pub use aggregate::{AggregatedResponse, ToolCallRecord, ToolResultRecord};
pub use chat_loop::{ChatLoop, ChatStream, DeferredResponse, LifecycleEvent, LifecycleKind};
pub use config::{ClientConfig, EndpointConfig, LoopConfig, RequestConfig};
pub use error::ClientError;
pub use events::{StreamEvent, StreamEventKind, ToolCall, ToolResult};
pub use observer::Subscription;
pub use plugins::{PluginBundle, PluginRegistry, ToolSchema, TrustConfig};
pub use request::{ChatMessage, JsonRequestBuilder, RequestBuilder, Role, ToolInvocation};
pub use stream::{FrameDecoder, FrameTag, RawFrame};
pub use transport::{FakeTransport, HttpTransport, OutboundRequest, Transport, TransportError};
