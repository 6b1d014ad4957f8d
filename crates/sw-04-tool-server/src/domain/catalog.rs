//! Tool catalog served by `tools/list`, and the server instructions.

use serde_json::{json, Value};
use shared_types::{tools, ToolDescriptor};

pub const INSTRUCTIONS: &str = r#"Seekwire searches code by meaning as well as by text.

## Available Tools:

- **semantic_search**: Find code by describing what it does, e.g. "function that handles authentication"
- **regex_search**: Pattern matching for exact text, symbols or specific syntax
- **hybrid_search**: Lexical and semantic rankings fused with RRF
- **index_status**: Check whether a directory is indexed
- **reindex**: Rebuild the index after the code changed
- **default_ignore_content**: The ignore file written for new projects
- **health_check**: Verify the server is running and responsive

## Pagination Parameters:

All search tools support:
- **page_size** (default: 50, max: 200) - Results per page
- **include_snippet** (default: true) - Include code snippets
- **snippet_length** (default: 500, max: 2000) - Max characters per snippet
- **cursor** - Opaque cursor for the next page; resend the same search arguments with it
- **context_lines** - Lines of context (semantic/hybrid only)

Cursors expire with their session after 5 minutes of inactivity. An expired or
rejected cursor means the search must be started again without one."#;

fn paging_properties() -> Value {
    json!({
        "page_size": {
            "type": "integer", "minimum": 1, "maximum": 200,
            "description": "Results per page (default 50)"
        },
        "cursor": {
            "type": "string",
            "description": "Cursor from a previous page's pagination.next_cursor"
        },
        "include_snippet": {
            "type": "boolean",
            "description": "Include code snippets (default true)"
        },
        "snippet_length": {
            "type": "integer", "minimum": 1,
            "description": "Max characters per snippet (default 500, max 2000)"
        }
    })
}

fn object_schema(mut properties: Value, required: &[&str], paged: bool) -> Value {
    if paged {
        if let (Some(props), Value::Object(paging)) = (properties.as_object_mut(), paging_properties()) {
            props.extend(paging);
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn similarity_schema() -> Value {
    object_schema(
        json!({
            "query": {"type": "string", "description": "What the code does, in plain words"},
            "path": {"type": "string", "description": "Directory or file to search"},
            "top_k": {"type": "integer", "minimum": 1, "description": "Candidates to rank (default 100)"},
            "threshold": {"type": "number", "minimum": 0, "maximum": 1, "description": "Minimum score"},
            "rerank": {"type": "boolean"},
            "rerank_model": {"type": "string"},
            "context_lines": {"type": "integer", "minimum": 0}
        }),
        &["query", "path"],
        true,
    )
}

fn descriptor(name: &str, description: &str, input_schema: Value) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Every tool the server offers.
#[must_use]
pub fn tool_catalog() -> Vec<ToolDescriptor> {
    vec![
        descriptor(
            tools::SEMANTIC_SEARCH,
            "Search for code semantically using embeddings",
            similarity_schema(),
        ),
        descriptor(
            tools::REGEX_SEARCH,
            "Search for code using regular expressions (grep-style)",
            object_schema(
                json!({
                    "pattern": {"type": "string", "description": "Regular expression"},
                    "path": {"type": "string", "description": "Directory or file to search"},
                    "ignore_case": {"type": "boolean"},
                    "context": {"type": "integer", "minimum": 0, "description": "Lines of context"},
                    "whole_word": {"type": "boolean"},
                    "fixed_string": {"type": "boolean", "description": "Treat the pattern as literal text"},
                    "include_patterns": {"type": "array", "items": {"type": "string"}},
                    "exclude_patterns": {"type": "array", "items": {"type": "string"}}
                }),
                &["pattern", "path"],
                true,
            ),
        ),
        descriptor(
            tools::HYBRID_SEARCH,
            "Hybrid search combining regex and semantic search with RRF ranking",
            similarity_schema(),
        ),
        descriptor(
            tools::INDEX_STATUS,
            "Get information about the index status for a directory",
            object_schema(json!({"path": {"type": "string"}}), &["path"], false),
        ),
        descriptor(
            tools::REINDEX,
            "Force reindexing of a directory with progress tracking",
            object_schema(
                json!({
                    "path": {"type": "string"},
                    "force": {"type": "boolean", "description": "Rebuild even if the index is fresh"}
                }),
                &["path"],
                false,
            ),
        ),
        descriptor(
            tools::DEFAULT_IGNORE_CONTENT,
            "Default ignore-file content for new projects",
            object_schema(json!({}), &[], false),
        ),
        descriptor(
            tools::HEALTH_CHECK,
            "Health check tool to verify server status",
            object_schema(json!({}), &[], false),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::SearchMode;

    #[test]
    fn test_catalog_names_unique_and_complete() {
        let catalog = tool_catalog();
        let mut names: Vec<_> = catalog.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 7);

        for mode in [SearchMode::Semantic, SearchMode::Regex, SearchMode::Hybrid] {
            assert!(names.contains(&mode.tool_name()));
        }
    }

    #[test]
    fn test_search_schemas_carry_paging() {
        for tool in tool_catalog() {
            let props = &tool.input_schema["properties"];
            let paged = SearchMode::from_tool_name(&tool.name).is_some();
            assert_eq!(props.get("cursor").is_some(), paged, "{}", tool.name);
            assert_eq!(tool.input_schema["type"], "object");
        }
    }
}
