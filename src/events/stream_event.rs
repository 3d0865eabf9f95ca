//! Typed stream events
//!
//! What the interpreter produces from raw frames and what callers of the
//! streaming surface observe.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::stream::RawFrame;

/// A tool invocation announced by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Unique per call, stable across rounds
    pub call_id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Create tool call
    pub fn new(call_id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Read a tool-call payload in either the normalized or the older shape
    ///
    /// Returns `None` when no tool name is present. Arguments delivered as a
    /// JSON string are parsed; anything that is not an object becomes empty.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let name = str_field(payload, &["name", "toolName"])?;
        let call_id = str_field(payload, &["callId", "toolCallId", "id"])
            .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));

        let arguments = match field(payload, &["arguments", "args", "input"]) {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            _ => Map::new(),
        };

        Some(Self {
            call_id,
            name,
            arguments,
        })
    }
}

/// Output of one tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    /// Opaque output; `{"error": ...}` when a local callback failed
    pub output: Value,
}

impl ToolResult {
    /// Create tool result
    pub fn new(call_id: impl Into<String>, name: impl Into<String>, output: Value) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            output,
        }
    }

    /// Read a tool-result payload (`output` or older `result`)
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let call_id = str_field(payload, &["callId", "toolCallId", "id"])?;
        let name = str_field(payload, &["name", "toolName"]).unwrap_or_default();
        let output = field(payload, &["output", "result"])
            .cloned()
            .unwrap_or(Value::Null);
        Some(Self {
            call_id,
            name,
            output,
        })
    }

    /// Whether the output is an error payload
    pub fn is_error(&self) -> bool {
        self.output.get("error").is_some()
    }
}

/// Normalized finish information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishInfo {
    /// `finishReason`, defaulting to `"stop"`
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_continued: Option<bool>,
}

impl FinishInfo {
    /// Read a finish payload
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            reason: str_field(payload, &["finishReason"]).unwrap_or_else(|| "stop".to_string()),
            usage: field(payload, &["usage"]).cloned(),
            is_continued: payload.get("isContinued").and_then(Value::as_bool),
        }
    }
}

/// Tools-exhausted condition reported by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsExhausted {
    /// Tools executed, summed across occurrences
    pub tools_executed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tools: Option<u64>,
    /// Number of times the condition was reported
    pub occurrences: u32,
    /// Envelope of the last report
    pub details: Value,
}

impl ToolsExhausted {
    /// Read counts from a `token_usage` envelope
    pub fn from_envelope(envelope: &Value) -> Self {
        Self {
            tools_executed: field(envelope, &["toolsExecuted", "toolCount"])
                .and_then(Value::as_u64)
                .unwrap_or(0),
            max_tools: envelope.get("maxTools").and_then(Value::as_u64),
            occurrences: 1,
            details: envelope.clone(),
        }
    }

    /// Fold another report into this one
    pub fn absorb(&mut self, other: &ToolsExhausted) {
        self.tools_executed += other.tools_executed;
        self.occurrences += other.occurrences;
        if other.max_tools.is_some() {
            self.max_tools = other.max_tools;
        }
        self.details = other.details.clone();
    }
}

/// Event kind, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    Text,
    ToolCall,
    ToolResult,
    MessageId,
    PathInfo,
    Reasoning,
    IntentContext,
    DevToolsInfo,
    MaxToolsReached,
    Timeout,
    AutoRetry,
    ToolValidationError,
    MissingTool,
    Finish,
    Error,
    Unknown,
}

/// Typed stream event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StreamEvent {
    Text(String),
    ToolCall(ToolCall),
    ToolResult(ToolResult),
    MessageId(String),
    PathInfo(Value),
    Reasoning(Value),
    IntentContext(Value),
    DevToolsInfo(Value),
    MaxToolsReached(ToolsExhausted),
    Timeout(Value),
    AutoRetry(Value),
    ToolValidationError(Value),
    MissingTool(Value),
    Finish(FinishInfo),
    Error(String),
    Unknown(RawFrame),
}

impl StreamEvent {
    /// Kind of this event
    pub fn kind(&self) -> StreamEventKind {
        match self {
            StreamEvent::Text(_) => StreamEventKind::Text,
            StreamEvent::ToolCall(_) => StreamEventKind::ToolCall,
            StreamEvent::ToolResult(_) => StreamEventKind::ToolResult,
            StreamEvent::MessageId(_) => StreamEventKind::MessageId,
            StreamEvent::PathInfo(_) => StreamEventKind::PathInfo,
            StreamEvent::Reasoning(_) => StreamEventKind::Reasoning,
            StreamEvent::IntentContext(_) => StreamEventKind::IntentContext,
            StreamEvent::DevToolsInfo(_) => StreamEventKind::DevToolsInfo,
            StreamEvent::MaxToolsReached(_) => StreamEventKind::MaxToolsReached,
            StreamEvent::Timeout(_) => StreamEventKind::Timeout,
            StreamEvent::AutoRetry(_) => StreamEventKind::AutoRetry,
            StreamEvent::ToolValidationError(_) => StreamEventKind::ToolValidationError,
            StreamEvent::MissingTool(_) => StreamEventKind::MissingTool,
            StreamEvent::Finish(_) => StreamEventKind::Finish,
            StreamEvent::Error(_) => StreamEventKind::Error,
            StreamEvent::Unknown(_) => StreamEventKind::Unknown,
        }
    }

    /// Text of a `text` event
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StreamEvent::Text(text) => Some(text),
            _ => None,
        }
    }
}

fn field<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| payload.get(*k))
        .find(|v| !v.is_null())
}

fn str_field(payload: &Value, keys: &[&str]) -> Option<String> {
    field(payload, keys).and_then(Value::as_str).map(str::to_string)
}
