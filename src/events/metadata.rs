//! Metadata envelope dispatch
//!
//! Tag `2` frames carry an array whose first element has its own `type`.

use serde_json::Value;

use super::stream_event::{StreamEvent, ToolsExhausted};

/// Inner metadata types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataType {
    PathInfo,
    Reasoning,
    IntentContext,
    DevToolsInfo,
    TokenUsage,
    TimeoutOccurred,
    AutoRetry,
    ToolValidationError,
    MissingTool,
    /// Unrecognized, surfaced as `path_info`
    Other,
}

impl MetadataType {
    /// Classify an inner `type` value
    pub fn parse(kind: &str) -> Self {
        match kind {
            "path_info" => MetadataType::PathInfo,
            "reasoning" => MetadataType::Reasoning,
            "intent_context" => MetadataType::IntentContext,
            "dev_tools_info" => MetadataType::DevToolsInfo,
            "token_usage" => MetadataType::TokenUsage,
            "timeout_occurred" => MetadataType::TimeoutOccurred,
            "auto_retry" => MetadataType::AutoRetry,
            "tool_validation_error" => MetadataType::ToolValidationError,
            "missing_tool" => MetadataType::MissingTool,
            _ => MetadataType::Other,
        }
    }
}

/// Dispatch a metadata payload to zero or more events
///
/// `token_usage` is re-emitted as `path_info` and, when it reports exhausted
/// tools without a timeout, also as `max_tools_reached`.
pub fn dispatch_metadata(payload: &Value) -> Vec<StreamEvent> {
    let envelope = match payload {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return Vec::new(),
        },
        other => other,
    };

    let kind = MetadataType::parse(envelope.get("type").and_then(Value::as_str).unwrap_or(""));
    let value = envelope.clone();

    match kind {
        MetadataType::PathInfo | MetadataType::Other => vec![StreamEvent::PathInfo(value)],
        MetadataType::Reasoning => vec![StreamEvent::Reasoning(value)],
        MetadataType::IntentContext => vec![StreamEvent::IntentContext(value)],
        MetadataType::DevToolsInfo => vec![StreamEvent::DevToolsInfo(value)],
        MetadataType::TimeoutOccurred => vec![StreamEvent::Timeout(value)],
        MetadataType::AutoRetry => vec![StreamEvent::AutoRetry(value)],
        MetadataType::ToolValidationError => vec![StreamEvent::ToolValidationError(value)],
        MetadataType::MissingTool => vec![StreamEvent::MissingTool(value)],
        MetadataType::TokenUsage => {
            let mut events = vec![StreamEvent::PathInfo(value)];
            if reports_exhausted_tools(envelope) {
                events.push(StreamEvent::MaxToolsReached(ToolsExhausted::from_envelope(
                    envelope,
                )));
            }
            events
        }
    }
}

fn reports_exhausted_tools(envelope: &Value) -> bool {
    let flag = |key: &str| envelope.get(key).and_then(Value::as_bool).unwrap_or(false);
    flag("maxToolsReached") && !flag("timedOut")
}
