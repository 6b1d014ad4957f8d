//! Search parameters and per-page options.
//!
//! [`SearchParams`] identifies *what* was searched; its hash is embedded in
//! every cursor so a cursor cannot be replayed against a different search.
//! [`PageRequest`] controls only how one page is rendered and is not hashed.

use super::config::SessionConfig;
use crate::error::{validate_page_size, validate_threshold, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use shared_types::SearchMode;

/// Everything that determines the ranked result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub mode: SearchMode,
    /// Free-text query, or the pattern in regex mode
    pub query: String,
    pub path: String,
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    pub ignore_case: bool,
    pub whole_word: bool,
    pub fixed_string: bool,
    pub context_lines: usize,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub rerank: bool,
    pub rerank_model: Option<String>,
}

impl SearchParams {
    pub fn new(mode: SearchMode, query: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            mode,
            query: query.into(),
            path: path.into(),
            top_k: None,
            threshold: None,
            ignore_case: false,
            whole_word: false,
            fixed_string: false,
            context_lines: 0,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            rerank: false,
            rerank_model: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.is_empty() {
            return Err(ValidationError::Empty {
                field: if self.mode.is_similarity() {
                    "query"
                } else {
                    "pattern"
                },
            });
        }
        if self.path.is_empty() {
            return Err(ValidationError::Empty { field: "path" });
        }
        if let Some(threshold) = self.threshold {
            validate_threshold(threshold)?;
        }
        Ok(())
    }

    /// Lowercase hex SHA-256 over every field that shapes the result list.
    #[must_use]
    pub fn params_hash(&self) -> String {
        let mut hasher = Sha256::new();
        // Length-prefixed, so no field or list item can bleed into the next.
        let mut field = |bytes: &[u8]| {
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };

        field(self.mode.as_str().as_bytes());
        field(self.query.as_bytes());
        field(self.path.as_bytes());
        field(format!("{:?}", self.top_k).as_bytes());
        field(format!("{:?}", self.threshold).as_bytes());
        field(&[
            u8::from(self.ignore_case),
            u8::from(self.whole_word),
            u8::from(self.fixed_string),
            u8::from(self.rerank),
        ]);
        field(self.context_lines.to_string().as_bytes());
        for patterns in [&self.include_patterns, &self.exclude_patterns] {
            field(&(patterns.len() as u64).to_le_bytes());
            for pattern in patterns {
                field(pattern.as_bytes());
            }
        }
        field(self.rerank_model.as_deref().unwrap_or("").as_bytes());

        format!("{:x}", hasher.finalize())
    }

    /// Mode-specific parameters echoed back in the search payload.
    #[must_use]
    pub fn echo(&self) -> Value {
        if self.mode.is_similarity() {
            json!({
                "top_k": self.top_k,
                "threshold": self.threshold,
            })
        } else {
            json!({
                "ignore_case": self.ignore_case,
                "context": self.context_lines,
            })
        }
    }
}

/// Per-page rendering options as sent by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub cursor: Option<String>,
    pub page_size: Option<usize>,
    pub include_snippet: Option<bool>,
    pub snippet_length: Option<usize>,
}

impl PageRequest {
    #[must_use]
    pub fn with_cursor(cursor: impl Into<String>) -> Self {
        Self {
            cursor: Some(cursor.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    /// Fill in defaults and check bounds. Page size is rejected when out of
    /// range; snippet length is clamped to the maximum.
    pub fn resolve(&self, config: &SessionConfig) -> Result<PageOptions, ValidationError> {
        let page_size = match self.page_size {
            Some(size) => validate_page_size(size, config.max_page_size)?,
            None => config.default_page_size,
        };

        Ok(PageOptions {
            page_size,
            include_snippet: self.include_snippet.unwrap_or(true),
            snippet_length: self
                .snippet_length
                .unwrap_or(config.default_snippet_length)
                .min(config.max_snippet_length),
        })
    }
}

/// Validated page options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub page_size: usize,
    pub include_snippet: bool,
    pub snippet_length: usize,
}
