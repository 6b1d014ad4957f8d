//! Tool envelopes to typed records.
//!
//! The server is allowed to leave optional fields out, and older servers do.
//! Every parser here fills the gaps instead of failing:
//!
//! | Missing            | Becomes                        |
//! |--------------------|--------------------------------|
//! | line bounds        | 1                              |
//! | byte bounds        | 0                              |
//! | language           | `"unknown"`                    |
//! | content            | empty snippet                  |
//! | score              | 0.0                            |
//! | count, total_count | length of the match list       |
//! | has_more           | whether a next cursor is given |

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{IndexStatus, ReindexOutcome, SearchResponse, SearchResult, Span, ToolResult};

pub const UNKNOWN_LANGUAGE: &str = "unknown";
const NO_MESSAGE: &str = "Tool reported an error without a message";

/// Server liveness report from `health_check`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthStatus {
    pub status: String,
    pub server: String,
    pub version: String,
    pub protocol: String,
    pub timestamp: String,
    pub cwd: String,
}

impl HealthStatus {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Turn a raw `tools/call` result into the tool's payload.
///
/// A failed tool becomes [`ClientError::Tool`]; a successful one yields its
/// structured content, or failing that the first text block that parses as
/// JSON.
pub fn unwrap_envelope(raw: Value) -> Result<Value, ClientError> {
    let envelope = parse_envelope(raw)?;
    if envelope.is_error() {
        return Err(ClientError::Tool {
            message: error_message(&envelope),
        });
    }
    payload(&envelope).ok_or_else(|| ClientError::Payload("no JSON payload in tool result".into()))
}

pub(crate) fn parse_envelope(raw: Value) -> Result<ToolResult, ClientError> {
    serde_json::from_value(raw).map_err(|e| ClientError::Payload(e.to_string()))
}

/// First available message of a failed tool result.
#[must_use]
pub fn error_message(envelope: &ToolResult) -> String {
    envelope
        .structured_content
        .as_ref()
        .and_then(|s| {
            s.get("error")
                .or_else(|| s.get("message"))
                .and_then(Value::as_str)
        })
        .map(str::to_owned)
        .or_else(|| envelope.texts().next().map(str::to_owned))
        .unwrap_or_else(|| NO_MESSAGE.to_string())
}

fn payload(envelope: &ToolResult) -> Option<Value> {
    if let Some(structured) = &envelope.structured_content {
        return Some(structured.clone());
    }
    envelope
        .texts()
        .find_map(|text| serde_json::from_str::<Value>(text).ok())
        .filter(|value| value.is_object() || value.is_array())
}

// =============================================================================
// SEARCH
// =============================================================================

/// Parse a search payload into a page of results.
#[must_use]
pub fn search_response(payload: &Value) -> SearchResponse {
    let results_block = payload.get("results");
    let matches = results_block
        .and_then(|r| r.get("matches").or(Some(r)))
        .and_then(Value::as_array)
        .map(|items| items.iter().map(search_result).collect::<Vec<_>>())
        .unwrap_or_default();

    let pagination = payload.get("pagination");
    let next_cursor = pagination
        .and_then(|p| p.get("next_cursor"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    let count = usize_at(results_block, "count").unwrap_or(matches.len());
    let total_count = usize_at(results_block, "total_count").unwrap_or(count);
    let has_more = results_block
        .and_then(|r| r.get("has_more"))
        .and_then(Value::as_bool)
        .unwrap_or(next_cursor.is_some());
    let truncated = results_block
        .and_then(|r| r.get("truncated"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let search_time_ms = payload
        .get("metadata")
        .and_then(|m| m.get("search_time_ms"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    SearchResponse {
        results: matches,
        count,
        total_count,
        has_more,
        next_cursor,
        search_time_ms,
        truncated,
        page_size: usize_at(pagination, "page_size"),
        current_page: usize_at(pagination, "current_page"),
    }
}

/// One match. Accepts both the nested `{file, match}` shape and a flat one.
#[must_use]
pub fn search_result(item: &Value) -> SearchResult {
    let file = item.get("file").unwrap_or(item);
    let found = item.get("match").unwrap_or(item);
    let span = found.get("span");

    let defaults = Span::default();
    SearchResult {
        path: str_at(Some(file), "path").unwrap_or_default(),
        language: str_at(Some(file), "language").unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
        snippet: str_at(Some(found), "content")
            .or_else(|| str_at(Some(found), "snippet"))
            .unwrap_or_default(),
        score: found
            .get("score")
            .and_then(Value::as_f64)
            .map_or(0.0, |s| s as f32),
        span: Span {
            byte_start: usize_at(span, "byte_start").unwrap_or(defaults.byte_start),
            byte_end: usize_at(span, "byte_end").unwrap_or(defaults.byte_end),
            line_start: usize_at(span, "line_start").unwrap_or(defaults.line_start),
            line_end: usize_at(span, "line_end").unwrap_or(defaults.line_end),
        },
    }
}

// =============================================================================
// OTHER TOOLS
// =============================================================================

/// `{index_status: {...}}`, or the status object itself.
pub fn index_status(payload: &Value) -> Result<IndexStatus, ClientError> {
    let body = payload.get("index_status").unwrap_or(payload);
    from_body(body)
}

/// `{reindex_result: {...}}`, or the outcome object itself.
pub fn reindex_outcome(payload: &Value) -> Result<ReindexOutcome, ClientError> {
    let body = payload.get("reindex_result").unwrap_or(payload);
    from_body(body)
}

pub fn health_status(payload: &Value) -> Result<HealthStatus, ClientError> {
    from_body(payload)
}

/// Ignore-file text. Read from the structured `content` field, else the
/// first text block verbatim.
pub fn ignore_content(raw: Value) -> Result<String, ClientError> {
    let envelope = parse_envelope(raw)?;
    if envelope.is_error() {
        return Err(ClientError::Tool {
            message: error_message(&envelope),
        });
    }

    envelope
        .structured_content
        .as_ref()
        .and_then(|s| s.get("content"))
        .and_then(Value::as_str)
        .or_else(|| envelope.texts().next())
        .map(str::to_owned)
        .ok_or_else(|| ClientError::Payload("no ignore content in tool result".into()))
}

fn from_body<T: serde::de::DeserializeOwned>(body: &Value) -> Result<T, ClientError> {
    if !body.is_object() {
        return Err(ClientError::Payload(format!("expected an object, got {body}")));
    }
    serde_json::from_value(body.clone()).map_err(|e| ClientError::Payload(e.to_string()))
}

fn usize_at(value: Option<&Value>, key: &str) -> Option<usize> {
    value
        .and_then(|v| v.get(key))
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

fn str_at(value: Option<&Value>, key: &str) -> Option<String> {
    value
        .and_then(|v| v.get(key))
        .and_then(Value::as_str)
        .map(str::to_owned)
}
