//! Standard line framing
//!
//! `data: <json>` lines whose object carries a `type` discriminator. Each
//! known type is rewritten into the legacy tag and payload shape so the
//! interpreter only has to know one vocabulary.

use serde_json::{Map, Value};

use super::frame::{FrameTag, RawFrame};

/// Prefix that marks a standard-format line
pub const DATA_PREFIX: &str = "data: ";

/// Terminal payload, dropped
pub const DONE_MARKER: &str = "[DONE]";

/// Standard event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardType {
    TextDelta,
    Start,
    DataCustom,
    Finish,
    ToolCall,
    ToolInputAvailable,
    ToolResult,
    Error,
    /// Boundary and streaming-delta markers that carry nothing to surface
    Boundary,
    Unrecognized,
}

impl StandardType {
    /// Classify a `type` field value
    pub fn parse(kind: &str) -> Self {
        match kind {
            "text-delta" => StandardType::TextDelta,
            "start" => StandardType::Start,
            "data-custom" => StandardType::DataCustom,
            "finish" => StandardType::Finish,
            "tool-call" => StandardType::ToolCall,
            "tool-input-available" => StandardType::ToolInputAvailable,
            "tool-result" => StandardType::ToolResult,
            "error" => StandardType::Error,
            "text-start" | "text-end" | "reasoning-start" | "reasoning-delta"
            | "reasoning-end" | "start-step" | "finish-step" | "tool-input-delta" => {
                StandardType::Boundary
            }
            _ => StandardType::Unrecognized,
        }
    }

    /// Legacy tag this type maps onto, `None` for dropped types
    pub fn tag(self) -> Option<FrameTag> {
        match self {
            StandardType::TextDelta => Some(FrameTag::Text),
            StandardType::Start => Some(FrameTag::MessageStart),
            StandardType::DataCustom => Some(FrameTag::Metadata),
            StandardType::Finish => Some(FrameTag::FinishStep),
            StandardType::ToolCall | StandardType::ToolInputAvailable => Some(FrameTag::ToolCall),
            StandardType::ToolResult => Some(FrameTag::ToolResult),
            StandardType::Error => Some(FrameTag::Error),
            StandardType::Boundary | StandardType::Unrecognized => None,
        }
    }
}

/// Parse the remainder of a `data: ` line
///
/// Returns `None` for `[DONE]`, boundary markers and unrecognized types.
/// Malformed JSON becomes an error frame rather than a failure.
pub fn parse_standard_data(data: &str, line: &str) -> Option<RawFrame> {
    let data = data.trim();
    if data == DONE_MARKER {
        return None;
    }

    let event: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => return Some(RawFrame::decode_error(format!("invalid JSON: {}", e), line)),
    };

    let kind = StandardType::parse(event.get("type").and_then(Value::as_str).unwrap_or(""));
    let tag = kind.tag()?;
    Some(RawFrame::new(tag, reshape(kind, &event), line))
}

fn reshape(kind: StandardType, event: &Value) -> Value {
    match kind {
        StandardType::TextDelta => first_of(event, &["delta", "textDelta", "text"])
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
        StandardType::Start => pick(event, &[("messageId", &["messageId"])]),
        StandardType::DataCustom => event.get("data").cloned().unwrap_or_else(|| event.clone()),
        StandardType::Finish => pick(
            event,
            &[
                ("finishReason", &["finishReason"]),
                ("usage", &["usage"]),
                ("isContinued", &["isContinued"]),
            ],
        ),
        StandardType::ToolCall | StandardType::ToolInputAvailable => pick(
            event,
            &[
                ("callId", &["toolCallId", "callId"]),
                ("name", &["toolName", "name"]),
                ("arguments", &["input", "args", "arguments"]),
            ],
        ),
        StandardType::ToolResult => pick(
            event,
            &[
                ("callId", &["toolCallId", "callId"]),
                ("name", &["toolName", "name"]),
                ("output", &["output", "result"]),
            ],
        ),
        StandardType::Error => {
            let message = first_of(event, &["message", "detail", "error", "errorText"])
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "unknown error".to_string());
            serde_json::json!({ "message": message })
        }
        StandardType::Boundary | StandardType::Unrecognized => Value::Null,
    }
}

fn first_of<'a>(event: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| event.get(*k))
        .find(|v| !v.is_null())
}

/// Build an object from the first present source field for each target key
fn pick(event: &Value, fields: &[(&str, &[&str])]) -> Value {
    let mut out = Map::new();
    for (target, sources) in fields {
        if let Some(value) = first_of(event, sources) {
            out.insert((*target).to_string(), value.clone());
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(data: &str) -> Option<RawFrame> {
        parse_standard_data(data, &format!("{}{}", DATA_PREFIX, data))
    }

    #[test]
    fn test_text_delta() {
        let frame = parse(r#"{"type":"text-delta","delta":"Hi"}"#).unwrap();
        assert_eq!(frame.tag, FrameTag::Text);
        assert_eq!(frame.payload, json!("Hi"));
    }

    #[test]
    fn test_done_and_boundaries_dropped() {
        assert!(parse("[DONE]").is_none());
        assert!(parse(r#"{"type":"text-start","id":"t"}"#).is_none());
        assert!(parse(r#"{"type":"reasoning-delta","delta":"x"}"#).is_none());
        assert!(parse(r#"{"type":"something-new"}"#).is_none());
        assert!(parse(r#"{"no_type":1}"#).is_none());
    }

    #[test]
    fn test_tool_input_available_renames_input() {
        let frame = parse(
            r#"{"type":"tool-input-available","toolCallId":"c1","toolName":"search","input":{"q":"x"}}"#,
        )
        .unwrap();
        assert_eq!(frame.tag, FrameTag::ToolCall);
        assert_eq!(
            frame.payload,
            json!({"callId":"c1","name":"search","arguments":{"q":"x"}})
        );
    }

    #[test]
    fn test_finish_keeps_present_fields() {
        let frame = parse(r#"{"type":"finish","finishReason":"stop"}"#).unwrap();
        assert_eq!(frame.tag, FrameTag::FinishStep);
        assert_eq!(frame.payload, json!({"finishReason":"stop"}));
    }

    #[test]
    fn test_error_fallbacks() {
        let frame = parse(r#"{"type":"error","detail":"bad"}"#).unwrap();
        assert_eq!(frame.payload, json!({"message":"bad"}));

        let frame = parse(r#"{"type":"error","errorText":"worse"}"#).unwrap();
        assert_eq!(frame.payload, json!({"message":"worse"}));

        let frame = parse(r#"{"type":"error"}"#).unwrap();
        assert_eq!(frame.payload, json!({"message":"unknown error"}));
    }

    #[test]
    fn test_malformed_json_is_error_frame() {
        let frame = parse("{oops").unwrap();
        assert!(frame.is_error());
        assert_eq!(frame.payload["raw"], "data: {oops");
    }

    #[test]
    fn test_data_custom_passthrough() {
        let frame =
            parse(r#"{"type":"data-custom","data":[{"type":"reasoning","text":"r"}]}"#).unwrap();
        assert_eq!(frame.tag, FrameTag::Metadata);
        assert_eq!(frame.payload, json!([{"type":"reasoning","text":"r"}]));
    }
}
