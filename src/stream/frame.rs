//! Raw frames
//!
//! One `RawFrame` per line-delimited unit of the wire protocol, with the
//! standard format already rewritten into the legacy tag vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::transport::TransportError;

/// Frame discriminator
///
/// Closed set of the tags the interpreter understands; anything else is
/// carried through as `Other` and surfaces as an `unknown` event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum FrameTag {
    /// `0` text delta
    Text,
    /// `2` metadata envelope
    Metadata,
    /// `9` tool call
    ToolCall,
    /// `a` tool result
    ToolResult,
    /// `d` finish message (legacy)
    FinishMessage,
    /// `e` finish step
    FinishStep,
    /// `f` message start
    MessageStart,
    /// `error` decode or stream failure
    Error,
    /// Any other tag
    Other(String),
}

impl FrameTag {
    /// Parse a tag string
    pub fn parse(tag: &str) -> Self {
        match tag {
            "0" => FrameTag::Text,
            "2" => FrameTag::Metadata,
            "9" => FrameTag::ToolCall,
            "a" => FrameTag::ToolResult,
            "d" => FrameTag::FinishMessage,
            "e" => FrameTag::FinishStep,
            "f" => FrameTag::MessageStart,
            "error" => FrameTag::Error,
            other => FrameTag::Other(other.to_string()),
        }
    }

    /// Tag from the first character of a legacy line
    pub fn from_legacy(tag: char) -> Self {
        let mut buf = [0u8; 4];
        Self::parse(tag.encode_utf8(&mut buf))
    }

    /// Wire string of this tag
    pub fn as_str(&self) -> &str {
        match self {
            FrameTag::Text => "0",
            FrameTag::Metadata => "2",
            FrameTag::ToolCall => "9",
            FrameTag::ToolResult => "a",
            FrameTag::FinishMessage => "d",
            FrameTag::FinishStep => "e",
            FrameTag::MessageStart => "f",
            FrameTag::Error => "error",
            FrameTag::Other(tag) => tag,
        }
    }
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FrameTag {
    fn from(tag: String) -> Self {
        FrameTag::parse(&tag)
    }
}

impl From<FrameTag> for String {
    fn from(tag: FrameTag) -> Self {
        tag.as_str().to_string()
    }
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFrame {
    pub tag: FrameTag,
    /// Decoded payload: string, object or array
    pub payload: Value,
    /// Line the frame was decoded from (empty for synthesized frames)
    pub source_line: String,
}

impl RawFrame {
    /// Create frame
    pub fn new(tag: FrameTag, payload: Value, source_line: impl Into<String>) -> Self {
        Self {
            tag,
            payload,
            source_line: source_line.into(),
        }
    }

    /// Error frame for a line whose JSON could not be parsed
    pub fn decode_error(message: impl Into<String>, line: &str) -> Self {
        Self::new(
            FrameTag::Error,
            json!({ "message": message.into(), "raw": line }),
            line,
        )
    }

    /// Error frame describing a failed byte source
    pub fn transport_error(err: &TransportError) -> Self {
        Self::new(
            FrameTag::Error,
            json!({ "message": err.to_string(), "timeout": err.is_timeout() }),
            "",
        )
    }

    /// Whether this is an `error` frame
    pub fn is_error(&self) -> bool {
        self.tag == FrameTag::Error
    }
}
