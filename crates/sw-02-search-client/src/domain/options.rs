//! Search options and their mapping onto tool arguments.

use serde_json::{Map, Value};
use shared_types::SearchMode;
use sw_03_search_sessions::domain::config::MAX_PAGE_SIZE;
use sw_03_search_sessions::{validate_page_size, validate_threshold, ValidationError};

/// One search request as the caller describes it.
///
/// `query` is the free-text query in the similarity modes and the pattern in
/// regex mode. Unset options are left out of the request so the server
/// applies its own defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub query: String,
    pub path: String,
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    pub ignore_case: Option<bool>,
    pub whole_word: Option<bool>,
    pub fixed_string: Option<bool>,
    pub context_lines: Option<usize>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub rerank: Option<bool>,
    pub rerank_model: Option<String>,
    pub page_size: Option<usize>,
    pub cursor: Option<String>,
    pub include_snippet: Option<bool>,
    pub snippet_length: Option<usize>,
}

impl SearchOptions {
    pub fn new(mode: SearchMode, query: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            mode,
            query: query.into(),
            path: path.into(),
            top_k: None,
            threshold: None,
            ignore_case: None,
            whole_word: None,
            fixed_string: None,
            context_lines: None,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            rerank: None,
            rerank_model: None,
            page_size: None,
            cursor: None,
            include_snippet: None,
            snippet_length: None,
        }
    }

    pub fn semantic(query: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(SearchMode::Semantic, query, path)
    }

    pub fn regex(pattern: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(SearchMode::Regex, pattern, path)
    }

    pub fn hybrid(query: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(SearchMode::Hybrid, query, path)
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Options for the page after `cursor`, keeping everything else.
    #[must_use]
    pub fn next_page(&self, cursor: impl Into<String>) -> Self {
        self.clone().with_cursor(cursor)
    }

    /// Checks applied before the request leaves the process.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.is_empty() {
            return Err(ValidationError::Empty {
                field: self.query_field(),
            });
        }
        if self.path.is_empty() {
            return Err(ValidationError::Empty { field: "path" });
        }
        if let Some(page_size) = self.page_size {
            validate_page_size(page_size, MAX_PAGE_SIZE)?;
        }
        if let Some(threshold) = self.threshold {
            validate_threshold(threshold)?;
        }
        Ok(())
    }

    fn query_field(&self) -> &'static str {
        if self.mode.is_similarity() {
            "query"
        } else {
            "pattern"
        }
    }

    /// Tool arguments for this mode.
    #[must_use]
    pub fn to_arguments(&self) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert(self.query_field().into(), self.query.clone().into());
        args.insert("path".into(), self.path.clone().into());

        if self.mode.is_similarity() {
            put(&mut args, "top_k", self.top_k);
            put(&mut args, "threshold", self.threshold);
            put(&mut args, "rerank", self.rerank);
            put(&mut args, "rerank_model", self.rerank_model.clone());
            put(&mut args, "context_lines", self.context_lines);
        } else {
            put(&mut args, "ignore_case", self.ignore_case);
            put(&mut args, "context", self.context_lines);
            put(&mut args, "whole_word", self.whole_word);
            put(&mut args, "fixed_string", self.fixed_string);
            if !self.include_patterns.is_empty() {
                args.insert("include_patterns".into(), self.include_patterns.clone().into());
            }
            if !self.exclude_patterns.is_empty() {
                args.insert("exclude_patterns".into(), self.exclude_patterns.clone().into());
            }
        }

        put(&mut args, "page_size", self.page_size);
        put(&mut args, "cursor", self.cursor.clone());
        put(&mut args, "include_snippet", self.include_snippet);
        put(&mut args, "snippet_length", self.snippet_length);
        args
    }
}

fn put<T: Into<Value>>(args: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        args.insert(key.into(), value.into());
    }
}
