//! # Search Records
//!
//! Typed results produced by the capability client and cached by the
//! session store.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// MODES
// =============================================================================

/// How a query is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Embedding similarity.
    Semantic,
    /// Literal or regular-expression matching.
    Regex,
    /// Lexical and semantic rankings fused together.
    Hybrid,
}

impl SearchMode {
    /// Tool that serves this mode.
    #[must_use]
    pub fn tool_name(self) -> &'static str {
        match self {
            Self::Semantic => crate::tool::tools::SEMANTIC_SEARCH,
            Self::Regex => crate::tool::tools::REGEX_SEARCH,
            Self::Hybrid => crate::tool::tools::HYBRID_SEARCH,
        }
    }

    /// Mode served by a tool, if the tool is a search tool.
    #[must_use]
    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name {
            crate::tool::tools::SEMANTIC_SEARCH => Some(Self::Semantic),
            crate::tool::tools::REGEX_SEARCH => Some(Self::Regex),
            crate::tool::tools::HYBRID_SEARCH => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Similarity modes take a free-text query, top-k and threshold.
    #[must_use]
    pub fn is_similarity(self) -> bool {
        !matches!(self, Self::Regex)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Regex => "regex",
            Self::Hybrid => "hybrid",
        }
    }

    /// Threshold applied when the caller does not pass one.
    #[must_use]
    pub fn default_threshold(self) -> Option<f32> {
        match self {
            Self::Semantic => Some(0.6),
            Self::Hybrid => Some(0.02),
            Self::Regex => None,
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Location of a match inside its file. Lines are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub byte_start: usize,
    pub byte_end: usize,
    pub line_start: usize,
    pub line_end: usize,
}

impl Default for Span {
    fn default() -> Self {
        Self {
            byte_start: 0,
            byte_end: 0,
            line_start: 1,
            line_end: 1,
        }
    }
}

/// One ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    pub span: Span,
    pub language: String,
    pub snippet: String,
    pub score: f32,
}

/// One page of a search.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// Matches on this page.
    pub count: usize,
    /// Matches across all pages.
    pub total_count: usize,
    pub has_more: bool,
    pub next_cursor: Option<String>,
    pub search_time_ms: u64,
    /// Snippets were shortened or dropped to fit the page size ceiling.
    pub truncated: bool,
    pub page_size: Option<usize>,
    pub current_page: Option<usize>,
}

// =============================================================================
// INDEX
// =============================================================================

/// Index health for one directory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexStatus {
    pub path: String,
    pub index_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_file_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_size_bytes: Option<u64>,
    /// Seconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<u64>,
    pub cache_hit: bool,
}

/// Result of a completed reindex.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReindexOutcome {
    pub status: String,
    pub duration_ms: u64,
    pub path: String,
    pub force: bool,
}

/// Out-of-band progress report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub message: Option<String>,
    pub progress: f64,
    pub total: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_tool_names() {
        for mode in [SearchMode::Semantic, SearchMode::Regex, SearchMode::Hybrid] {
            assert_eq!(SearchMode::from_tool_name(mode.tool_name()), Some(mode));
        }
        assert_eq!(SearchMode::from_tool_name("reindex"), None);
    }

    #[test]
    fn test_mode_defaults() {
        assert!(!SearchMode::Regex.is_similarity());
        assert_eq!(SearchMode::Semantic.default_threshold(), Some(0.6));
        assert_eq!(SearchMode::Hybrid.default_threshold(), Some(0.02));
        assert_eq!(SearchMode::Regex.default_threshold(), None);
    }

    #[test]
    fn test_span_default_points_at_file_start() {
        let span = Span::default();
        assert_eq!(span.line_start, 1);
        assert_eq!(span.byte_start, 0);
    }

    #[test]
    fn test_index_status_tolerates_sparse_payload() {
        let status: IndexStatus =
            serde_json::from_str(r#"{"path": "/repo", "index_exists": false}"#).unwrap();
        assert_eq!(status.path, "/repo");
        assert!(!status.index_exists);
        assert!(!status.cache_hit);
        assert_eq!(status.total_files, None);
    }
}
