//! Request construction boundary
//!
//! The chat loop hands the message history and the advertised tools to a
//! [`RequestBuilder`] and sends whatever it returns. Authentication and
//! session resolution belong to the builder or to a pre-request hook.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::plugins::ToolSchema;
use crate::transport::OutboundRequest;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One executed tool call, replayed to the server in the follow-up turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
    pub output: Value,
}

/// Conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_invocations: Vec<ToolInvocation>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_invocations: Vec::new(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Assistant message bundling executed tool calls
    pub fn assistant_with_tools(content: impl Into<String>, invocations: Vec<ToolInvocation>) -> Self {
        Self {
            tool_invocations: invocations,
            ..Self::new(Role::Assistant, content)
        }
    }
}

/// Builds the next request from the conversation so far
pub trait RequestBuilder: Send + Sync {
    fn build(&self, messages: &[ChatMessage], tools: &[ToolSchema]) -> Result<OutboundRequest, ClientError>;
}

/// Default JSON body builder
///
/// Produces `{"messages": [...], "tools": [...]}` merged with static fields
/// such as the model name. Static fields never override `messages` or
/// `tools`.
#[derive(Debug, Clone, Default)]
pub struct JsonRequestBuilder {
    fields: Map<String, Value>,
}

impl JsonRequestBuilder {
    /// Create builder with no extra fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Create builder from a field map
    pub fn with_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Add a static body field
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

impl RequestBuilder for JsonRequestBuilder {
    fn build(&self, messages: &[ChatMessage], tools: &[ToolSchema]) -> Result<OutboundRequest, ClientError> {
        let mut body = self.fields.clone();
        body.insert(
            "messages".to_string(),
            serde_json::to_value(messages).map_err(|e| ClientError::Request(e.to_string()))?,
        );
        if !tools.is_empty() {
            body.insert(
                "tools".to_string(),
                serde_json::to_value(tools).map_err(|e| ClientError::Request(e.to_string()))?,
            );
        }
        Ok(OutboundRequest::new(Value::Object(body)))
    }
}
