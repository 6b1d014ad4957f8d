//! Snippet shaping and the page size guard.

use super::config::MIN_SNIPPET_LENGTH;
use super::params::PageOptions;
use shared_types::SearchResult;

pub const SNIPPET_OMITTED: &str = "[snippet omitted]";
pub const ELLIPSIS: &str = "...";

/// Cut `snippet` to at most `max_bytes` bytes on a char boundary and append
/// `...`. Returns whether anything was cut.
pub fn truncate_snippet(snippet: &mut String, max_bytes: usize) -> bool {
    if snippet.len() <= max_bytes {
        return false;
    }
    let mut end = max_bytes;
    while !snippet.is_char_boundary(end) {
        end -= 1;
    }
    snippet.truncate(end);
    snippet.push_str(ELLIPSIS);
    true
}

/// Apply the caller's snippet options to one page.
pub fn shape_snippets(results: &mut [SearchResult], options: &PageOptions) {
    for result in results.iter_mut() {
        if options.include_snippet {
            truncate_snippet(&mut result.snippet, options.snippet_length);
        } else {
            result.snippet = SNIPPET_OMITTED.to_string();
        }
    }
}

/// Serialized size of a list of matches.
#[must_use]
pub fn page_bytes(results: &[SearchResult]) -> usize {
    serde_json::to_vec(results).map(|v| v.len()).unwrap_or(0)
}

/// What [`fit_to_budget`] had to do to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetFit {
    Untouched,
    /// Snippets cut to the minimum length.
    Shortened,
    /// Snippets replaced by [`SNIPPET_OMITTED`].
    Omitted,
    /// Snippets omitted and the matches alone still exceed the ceiling.
    Exceeded,
}

impl BudgetFit {
    /// Whether any snippet content was removed.
    #[must_use]
    pub fn is_truncated(self) -> bool {
        self != Self::Untouched
    }

    #[must_use]
    pub fn is_within_budget(self) -> bool {
        self != Self::Exceeded
    }
}

/// Keep the serialized match list under `max_bytes`: shorten every snippet
/// first, then drop them. Paths and spans are never cut, so a page of many
/// long paths can stay over the ceiling.
///
/// Only the match list is measured. The envelope the page is sent in
/// (pagination, query echo, metadata) is bounded by the request and sits
/// outside the ceiling.
pub fn fit_to_budget(results: &mut [SearchResult], max_bytes: usize) -> BudgetFit {
    if page_bytes(results) <= max_bytes {
        return BudgetFit::Untouched;
    }

    for result in results.iter_mut() {
        truncate_snippet(&mut result.snippet, MIN_SNIPPET_LENGTH);
    }
    if page_bytes(results) <= max_bytes {
        return BudgetFit::Shortened;
    }

    for result in results.iter_mut() {
        result.snippet = SNIPPET_OMITTED.to_string();
    }
    if page_bytes(results) <= max_bytes {
        BudgetFit::Omitted
    } else {
        BudgetFit::Exceeded
    }
}
