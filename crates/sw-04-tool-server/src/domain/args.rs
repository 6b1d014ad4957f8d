//! Tool arguments as they arrive in `tools/call`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use shared_types::SearchMode;
use sw_03_search_sessions::{PageRequest, SearchParams};

/// Arguments of `semantic_search` and `hybrid_search`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimilarityArgs {
    pub query: String,
    pub path: String,
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    pub rerank: Option<bool>,
    pub rerank_model: Option<String>,
    pub context_lines: Option<usize>,
    #[serde(flatten)]
    pub page: PageArgs,
}

/// Arguments of `regex_search`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegexArgs {
    pub pattern: String,
    pub path: String,
    pub ignore_case: Option<bool>,
    pub context: Option<usize>,
    pub whole_word: Option<bool>,
    pub fixed_string: Option<bool>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    #[serde(flatten)]
    pub page: PageArgs,
}

/// Paging options shared by every search tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageArgs {
    pub cursor: Option<String>,
    pub page_size: Option<usize>,
    pub include_snippet: Option<bool>,
    pub snippet_length: Option<usize>,
}

impl From<PageArgs> for PageRequest {
    fn from(args: PageArgs) -> Self {
        Self {
            cursor: args.cursor,
            page_size: args.page_size,
            include_snippet: args.include_snippet,
            snippet_length: args.snippet_length,
        }
    }
}

/// Arguments of `index_status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathArgs {
    pub path: String,
}

/// Arguments of `reindex`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReindexArgs {
    pub path: String,
    #[serde(default)]
    pub force: bool,
}

impl SimilarityArgs {
    /// Search parameters with the server defaults filled in, so that a
    /// cursor request hashes the same as the request that created it.
    #[must_use]
    pub fn into_parts(self, mode: SearchMode, default_top_k: usize) -> (SearchParams, PageRequest) {
        let params = SearchParams {
            top_k: Some(self.top_k.unwrap_or(default_top_k)),
            threshold: self.threshold.or_else(|| mode.default_threshold()),
            context_lines: self.context_lines.unwrap_or(0),
            rerank: self.rerank.unwrap_or(false),
            rerank_model: self.rerank_model,
            ..SearchParams::new(mode, self.query, self.path)
        };
        (params, self.page.into())
    }
}

impl RegexArgs {
    #[must_use]
    pub fn into_parts(self) -> (SearchParams, PageRequest) {
        let params = SearchParams {
            ignore_case: self.ignore_case.unwrap_or(false),
            whole_word: self.whole_word.unwrap_or(false),
            fixed_string: self.fixed_string.unwrap_or(false),
            context_lines: self.context.unwrap_or(0),
            include_patterns: self.include_patterns,
            exclude_patterns: self.exclude_patterns,
            ..SearchParams::new(SearchMode::Regex, self.pattern, self.path)
        };
        (params, self.page.into())
    }
}

/// Deserialize a tool's argument map.
pub fn parse<T: DeserializeOwned>(arguments: Map<String, Value>) -> Result<T, String> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| format!("Invalid parameters: {e}"))
}
