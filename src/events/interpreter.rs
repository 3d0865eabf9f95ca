//! Event interpreter
//!
//! Maps raw frames to typed events. Pure apart from the text-join state,
//! which lives here so one interpreter can span several rounds.

use serde_json::Value;
use tracing::{debug, warn};

use super::metadata::dispatch_metadata;
use super::stream_event::{FinishInfo, StreamEvent, ToolCall, ToolResult};
use super::text_join::TextJoinState;
use crate::stream::{FrameTag, RawFrame};

/// Frame-to-event interpreter
#[derive(Debug, Clone, Default)]
pub struct EventInterpreter {
    join: TextJoinState,
}

impl EventInterpreter {
    /// Create interpreter with fresh text-join state
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpret one frame
    ///
    /// Usually zero or one event; a `token_usage` envelope reporting
    /// exhausted tools yields two.
    pub fn interpret(&mut self, frame: &RawFrame) -> Vec<StreamEvent> {
        match &frame.tag {
            FrameTag::Text => {
                let text = match &frame.payload {
                    Value::String(s) => s.clone(),
                    Value::Null => return Vec::new(),
                    other => other.to_string(),
                };
                if text.is_empty() {
                    return Vec::new();
                }
                vec![StreamEvent::Text(self.join.join(&text))]
            }
            FrameTag::ToolCall => match ToolCall::from_payload(&frame.payload) {
                Some(call) => {
                    self.join.note_tool_activity();
                    vec![StreamEvent::ToolCall(call)]
                }
                None => {
                    warn!(line = %frame.source_line, "tool call without a name");
                    vec![StreamEvent::Unknown(frame.clone())]
                }
            },
            FrameTag::ToolResult => match ToolResult::from_payload(&frame.payload) {
                Some(result) => {
                    self.join.note_tool_activity();
                    vec![StreamEvent::ToolResult(result)]
                }
                None => {
                    warn!(line = %frame.source_line, "tool result without a call id");
                    vec![StreamEvent::Unknown(frame.clone())]
                }
            },
            FrameTag::MessageStart => frame
                .payload
                .get("messageId")
                .and_then(Value::as_str)
                .map(|id| vec![StreamEvent::MessageId(id.to_string())])
                .unwrap_or_default(),
            FrameTag::FinishStep | FrameTag::FinishMessage => {
                vec![StreamEvent::Finish(FinishInfo::from_payload(&frame.payload))]
            }
            FrameTag::Metadata => dispatch_metadata(&frame.payload),
            FrameTag::Error => vec![StreamEvent::Error(error_message(&frame.payload))],
            FrameTag::Other(tag) => {
                debug!(tag = %tag, "unknown frame tag");
                vec![StreamEvent::Unknown(frame.clone())]
            }
        }
    }

    /// Record tool activity that did not arrive as a frame
    pub fn note_tool_activity(&mut self) {
        self.join.note_tool_activity();
    }
}

fn error_message(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

/// Interpret a whole frame sequence with one interpreter
pub fn interpret_all<'a>(frames: impl IntoIterator<Item = &'a RawFrame>) -> Vec<StreamEvent> {
    let mut interpreter = EventInterpreter::new();
    frames
        .into_iter()
        .flat_map(|f| interpreter.interpret(f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StreamEventKind;
    use crate::stream::decode_text;
    use serde_json::json;

    #[test]
    fn test_message_id_without_field() {
        let frames = decode_text("f:{\"other\":1}\n");
        assert!(interpret_all(&frames).is_empty());
    }

    #[test]
    fn test_legacy_finish_message() {
        let frames = decode_text("d:{\"finishReason\":\"length\"}\n");
        let events = interpret_all(&frames);
        match &events[0] {
            StreamEvent::Finish(info) => assert_eq!(info.reason, "length"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_frame() {
        let frames = decode_text("data: {\"type\":\"error\",\"message\":\"quota\"}\n");
        assert_eq!(interpret_all(&frames), vec![StreamEvent::Error("quota".to_string())]);
    }

    #[test]
    fn test_unknown_tag_carries_frame() {
        let frames = decode_text("8:[1,2]\n");
        let events = interpret_all(&frames);
        match &events[0] {
            StreamEvent::Unknown(frame) => assert_eq!(frame.payload, json!([1, 2])),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_text_after_tool_call_gets_newline() {
        let frames = decode_text(
            "0:\"Let me check.\"\n9:{\"callId\":\"c1\",\"name\":\"t\",\"arguments\":{}}\n0:\"found\"\n",
        );
        let events = interpret_all(&frames);
        assert_eq!(events[0].kind(), StreamEventKind::Text);
        assert_eq!(events[2].as_text(), Some("\nfound"));
    }
}
