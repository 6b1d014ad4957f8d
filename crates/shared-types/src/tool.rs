//! # Tool Protocol
//!
//! Handshake and tool-invocation envelopes layered on top of JSON-RPC.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Method names.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const PROGRESS: &str = "notifications/progress";
    pub const LOG_MESSAGE: &str = "notifications/message";
}

/// Tool names.
pub mod tools {
    pub const SEMANTIC_SEARCH: &str = "semantic_search";
    pub const REGEX_SEARCH: &str = "regex_search";
    pub const HYBRID_SEARCH: &str = "hybrid_search";
    pub const INDEX_STATUS: &str = "index_status";
    pub const REINDEX: &str = "reindex";
    pub const DEFAULT_IGNORE_CONTENT: &str = "default_ignore_content";
    pub const HEALTH_CHECK: &str = "health_check";
}

/// Name and version of one side of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

impl Implementation {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default = "empty_object")]
    pub capabilities: Value,
    pub client_info: Implementation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default = "empty_object")]
    pub capabilities: Value,
    pub server_info: Implementation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ToolCallParams {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
            meta: None,
        }
    }

    /// Token the caller wants progress notifications tagged with.
    #[must_use]
    pub fn progress_token(&self) -> Option<&Value> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.get("progressToken"))
            .filter(|token| !token.is_null())
    }
}

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
    /// Images, resources and anything else this side does not render.
    #[serde(other)]
    Other,
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Other => None,
        }
    }
}

/// Result envelope of `tools/call`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResult {
    /// Successful result: a human summary, the payload as a JSON text block,
    /// and the same payload as structured content.
    pub fn success(summary: impl Into<String>, payload: Value) -> Self {
        Self {
            content: vec![
                ToolContent::text(summary),
                ToolContent::text(payload.to_string()),
            ],
            structured_content: Some(payload),
            is_error: Some(false),
        }
    }

    /// Failed result carrying one message.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            content: vec![ToolContent::text(message.clone())],
            structured_content: Some(serde_json::json!({ "error": message })),
            is_error: Some(true),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    /// Text blocks in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(ToolContent::as_text)
    }
}

/// Catalog entry returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Parameters of `notifications/progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressParams {
    #[serde(default)]
    pub progress_token: Value,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Parameters of `notifications/message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessageParams {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    #[serde(default)]
    pub data: Value,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initialize_params_wire_names() {
        let params = InitializeParams {
            protocol_version: crate::PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Implementation::new("seekwire", "0.1.0"),
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["protocolVersion"], "2024-11-05");
        assert_eq!(value["clientInfo"]["name"], "seekwire");
        assert_eq!(value["capabilities"], json!({}));
    }

    #[test]
    fn test_progress_token_lookup() {
        let params: ToolCallParams = serde_json::from_value(json!({
            "name": "reindex",
            "arguments": {"path": "."},
            "_meta": {"progressToken": "tok-1"}
        }))
        .unwrap();
        assert_eq!(params.progress_token(), Some(&json!("tok-1")));

        let bare = ToolCallParams::new("reindex", Map::new());
        assert_eq!(bare.progress_token(), None);
    }

    #[test]
    fn test_unknown_content_blocks_are_tolerated() {
        let result: ToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "image", "data": "...", "mimeType": "image/png"},
                {"type": "text", "text": "hello"}
            ]
        }))
        .unwrap();
        assert!(!result.is_error());
        assert_eq!(result.texts().collect::<Vec<_>>(), vec!["hello"]);
    }

    #[test]
    fn test_failure_envelope() {
        let value = serde_json::to_value(ToolResult::failure("index locked")).unwrap();
        assert_eq!(value["isError"], true);
        assert_eq!(value["structuredContent"]["error"], "index locked");
        assert_eq!(value["content"][0]["type"], "text");
    }
}
