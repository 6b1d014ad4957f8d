//! # Line Framing
//!
//! One message per line in both directions.
//!
//! The framing relies on compact JSON never containing a raw line break:
//! `serde_json` escapes `\n` and `\r` inside strings and emits no whitespace
//! between tokens. A peer that needs to ship arbitrary multi-line payloads
//! verbatim should move to length-prefixed framing rather than attempt
//! multi-line JSON on top of line splitting.

use crate::errors::ProtocolError;
use crate::jsonrpc::Message;
use serde_json::Value;

/// Serialize a message to one newline-terminated line.
pub fn encode_line(message: &Message) -> Result<String, ProtocolError> {
    let mut line =
        serde_json::to_string(message).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
    if line.contains('\n') || line.contains('\r') {
        return Err(ProtocolError::EmbeddedLineBreak);
    }
    line.push('\n');
    Ok(line)
}

/// Parse one received line.
///
/// Blank lines yield `Ok(None)`. Trailing `\r` from CRLF peers is ignored.
pub fn decode_line(line: &str) -> Result<Option<Message>, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|e| {
        let preview: String = trimmed.chars().take(120).collect();
        ProtocolError::Unparsable(format!("{} in {:?}", e, preview))
    })?;

    Message::from_value(value).map(Some)
}
