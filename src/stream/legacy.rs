//! Legacy line framing
//!
//! `<tag><ignored><payload>`: the first character is the tag, the payload
//! starts at a fixed two-character offset and is JSON or a bare string.

use serde_json::Value;

use super::frame::{FrameTag, RawFrame};

/// Characters before the payload in a legacy line
pub const PAYLOAD_OFFSET: usize = 2;

/// Parse one non-blank legacy line
pub fn parse_legacy_line(line: &str) -> Option<RawFrame> {
    let tag = line.chars().next()?;
    // A line shorter than the offset has an empty payload
    let raw = line
        .char_indices()
        .nth(PAYLOAD_OFFSET)
        .map_or("", |(start, _)| &line[start..]);
    Some(RawFrame::new(
        FrameTag::from_legacy(tag),
        decode_legacy_payload(raw),
        line,
    ))
}

/// Decode a legacy payload
///
/// Servers sometimes double-encode tool results as a JSON string holding
/// JSON. One extra parse is attempted for strings that start like JSON.
pub fn decode_legacy_payload(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(inner)) => {
            let trimmed = inner.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                if let Ok(nested) = serde_json::from_str::<Value>(&inner) {
                    return nested;
                }
            }
            Value::String(inner)
        }
        Ok(value) => value,
        Err(_) => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_text_line() {
        let frame = parse_legacy_line("0:\"Hello\"").unwrap();
        assert_eq!(frame.tag, FrameTag::Text);
        assert_eq!(frame.payload, json!("Hello"));
        assert_eq!(frame.source_line, "0:\"Hello\"");
    }

    #[test]
    fn test_double_encoded_payload() {
        let single = decode_legacy_payload(r#"{"callId":"c1","output":{"n":1}}"#);
        let double = decode_legacy_payload(r#""{\"callId\":\"c1\",\"output\":{\"n\":1}}""#);
        assert_eq!(single, double);
    }

    #[test]
    fn test_json_looking_string_that_fails_stays_string() {
        let value = decode_legacy_payload(r#""{not json""#);
        assert_eq!(value, json!("{not json"));
    }

    #[test]
    fn test_unparseable_payload_falls_back_to_raw() {
        assert_eq!(decode_legacy_payload("plain words"), json!("plain words"));
    }

    #[test]
    fn test_payload_starts_after_offset() {
        // Separator character is not checked
        let frame = parse_legacy_line("0|\"ok\"").unwrap();
        assert_eq!(frame.payload, json!("ok"));

        let short = parse_legacy_line("0").unwrap();
        assert_eq!(short.tag, FrameTag::Text);
        assert_eq!(short.payload, json!(""));
    }

    #[test]
    fn test_multibyte_tag_line() {
        let frame = parse_legacy_line("é:\"x\"").unwrap();
        assert_eq!(frame.tag, FrameTag::Other("é".to_string()));
        assert_eq!(frame.payload, json!("x"));
    }
}
