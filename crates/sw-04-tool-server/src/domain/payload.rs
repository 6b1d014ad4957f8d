//! Tool payloads and the one-line summaries sent next to them.

use serde_json::{json, Value};
use shared_types::{IndexStatus, SearchMode, SearchResult};
use std::path::Path;
use sw_03_search_sessions::{SearchPage, SearchParams};

/// Header written above the default ignore patterns.
pub const IGNORE_FILE_HEADER: &str = "# Files and directories excluded from indexing.\n\
# One pattern per line, gitignore syntax.\n";

fn match_json(result: &SearchResult, mode: SearchMode) -> Value {
    let mut found = json!({
        "span": {
            "byte_start": result.span.byte_start,
            "byte_end": result.span.byte_end,
            "line_start": result.span.line_start,
            "line_end": result.span.line_end
        },
        "content": result.snippet
    });

    match mode {
        SearchMode::Semantic => found["score"] = json!(result.score),
        SearchMode::Hybrid => {
            found["score"] = json!(result.score);
            found["rrf_score"] = json!(result.score);
        }
        SearchMode::Regex => found["line_number"] = json!(result.span.line_start),
    }

    json!({
        "file": {"path": result.path, "language": result.language},
        "match": found,
        "type": format!("{}_match", mode)
    })
}

/// Structured payload for one page of a search.
#[must_use]
pub fn search_page(page: &SearchPage, params: &SearchParams, search_time_ms: u64) -> Value {
    let matches: Vec<Value> = page
        .matches
        .iter()
        .map(|result| match_json(result, params.mode))
        .collect();

    json!({
        "search": {
            "query": params.query,
            "mode": params.mode,
            "parameters": params.echo()
        },
        "results": {
            "matches": matches,
            "count": page.count,
            "total_count": page.total_count,
            "has_more": page.has_more,
            "truncated": page.truncated
        },
        "pagination": {
            "next_cursor": page.next_cursor,
            "page_size": page.page_size,
            "current_page": page.current_page
        },
        "metadata": {
            "search_time_ms": search_time_ms
        }
    })
}

#[must_use]
pub fn search_summary(page: &SearchPage, params: &SearchParams, from_cursor: bool) -> String {
    if from_cursor {
        return format!(
            "Retrieved page {} of {} search results for '{}'",
            page.current_page, params.mode, params.query
        );
    }

    match params.mode {
        SearchMode::Regex => format!(
            "Regex search for pattern '{}' found {} matches in {} (case_sensitive: {}, context: {} lines) - Page {}",
            params.query,
            page.total_count,
            params.path,
            !params.ignore_case,
            params.context_lines,
            page.current_page
        ),
        SearchMode::Semantic | SearchMode::Hybrid => format!(
            "{} search for '{}' found {} matches in {} (threshold: {:.2}, top_k: {}) - Page {}",
            if params.mode == SearchMode::Semantic { "Semantic" } else { "Hybrid" },
            params.query,
            page.total_count,
            params.path,
            params.threshold.unwrap_or_default(),
            params.top_k.unwrap_or_default(),
            page.current_page
        ),
    }
}

#[must_use]
pub fn path_type(path: &Path) -> &'static str {
    if path.is_dir() {
        "directory"
    } else {
        "file"
    }
}

#[must_use]
pub fn index_status_summary(status: &IndexStatus) -> String {
    if !status.index_exists {
        return format!(
            "No index found for {} - indexing would be required for semantic search",
            status.path
        );
    }

    let files = status
        .total_files
        .or(status.estimated_file_count)
        .unwrap_or(0);
    match status.total_chunks {
        Some(chunks) if chunks > 0 => format!(
            "Index exists for {} with {} files and {} chunks",
            status.path, files, chunks
        ),
        _ => format!("Index exists for {} with {} files", status.path, files),
    }
}

/// Ignore-file text for `patterns`.
#[must_use]
pub fn ignore_file(patterns: &[String]) -> String {
    let mut content = String::from(IGNORE_FILE_HEADER);
    content.push('\n');
    for pattern in patterns {
        content.push_str(pattern);
        content.push('\n');
    }
    content
}

/// Current time as RFC 3339.
#[must_use]
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
