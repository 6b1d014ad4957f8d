//! Filesystem-backed search engine.
//!
//! Regex search reads files directly on every call. The similarity modes run
//! over an in-memory index of fixed line windows, built on first use or by
//! `reindex`:
//!
//! - **semantic**: share of the query terms that occur in the window
//! - **hybrid**: the semantic ranking and a term frequency ranking fused by
//!   reciprocal rank (`1 / (60 + rank)` per ranking)
//!
//! Walking honours `.gitignore` and skips the default excluded directories.

use crate::ports::{BackendError, ProgressSink, SearchBackend};
use async_trait::async_trait;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use shared_types::{IndexStatus, SearchMode, SearchResult, Span};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use sw_03_search_sessions::SearchParams;
use tracing::{debug, info};

/// Lines per indexed window.
pub const CHUNK_LINES: usize = 20;
/// Larger files are not searched.
pub const MAX_FILE_BYTES: u64 = 1024 * 1024;
const RRF_K: f32 = 60.0;

/// Directory and file names never walked into.
#[must_use]
pub fn default_exclude_patterns() -> Vec<String> {
    [
        // index and model caches
        ".seekwire",
        ".fastembed_cache",
        ".cache",
        "__pycache__",
        // version control
        ".git",
        ".svn",
        ".hg",
        // build output
        "target",
        "build",
        "dist",
        "node_modules",
        ".gradle",
        ".mvn",
        "bin",
        "obj",
        // virtual environments
        "venv",
        ".venv",
        "env",
        ".env",
        "virtualenv",
        // editors
        ".vscode",
        ".idea",
        ".eclipse",
        // scratch
        "tmp",
        "temp",
        ".tmp",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn language_of(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "rs" => "rust",
        "py" | "pyi" => "python",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "hs" => "haskell",
        "sh" | "bash" | "zsh" => "shell",
        "md" | "markdown" => "markdown",
        "toml" => "toml",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        _ => "unknown",
    }
}

/// Lowercase query terms, two characters or longer, first occurrence only.
fn terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

// =============================================================================
// FILES AND INDEX
// =============================================================================

struct SourceFile {
    display: String,
    language: &'static str,
    text: String,
    /// Byte offset of each line start
    line_starts: Vec<usize>,
}

impl SourceFile {
    fn new(display: String, language: &'static str, text: String) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.match_indices('\n')
                .map(|(i, _)| i + 1)
                .filter(|&start| start < text.len()),
        );
        if text.is_empty() {
            line_starts.clear();
        }
        Self {
            display,
            language,
            text,
            line_starts,
        }
    }

    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line_end(&self, line: usize) -> usize {
        self.line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Text of one 0-based line without its terminator.
    fn line(&self, line: usize) -> &str {
        self.text[self.line_starts[line]..self.line_end(line)].trim_end_matches(['\n', '\r'])
    }

    /// Lines `first..=last` joined by `\n`.
    fn lines(&self, first: usize, last: usize) -> String {
        (first..=last)
            .map(|i| self.line(i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Result covering lines `first..=last`, with the snippet widened by
    /// `context` lines on each side.
    fn result(&self, first: usize, last: usize, context: usize, score: f32) -> SearchResult {
        let shown_first = first.saturating_sub(context);
        let shown_last = (last + context).min(self.line_count() - 1);
        SearchResult {
            path: self.display.clone(),
            span: Span {
                byte_start: self.line_starts[first],
                byte_end: self.line_end(last),
                line_start: first + 1,
                line_end: last + 1,
            },
            language: self.language.to_string(),
            snippet: self.lines(shown_first, shown_last),
            score,
        }
    }
}

struct Chunk {
    file: usize,
    first: usize,
    last: usize,
    /// Lowercased window text
    folded: String,
}

struct TreeIndex {
    files: Vec<SourceFile>,
    chunks: Vec<Chunk>,
    /// Paths the walk produced, including ones `read_source` skipped.
    walked: usize,
    built_at: SystemTime,
    bytes: u64,
}

impl TreeIndex {
    fn status(&self, path: &str) -> IndexStatus {
        IndexStatus {
            path: path.to_string(),
            index_exists: true,
            total_files: Some(self.files.len() as u64),
            total_chunks: Some(self.chunks.len() as u64),
            index_size_bytes: Some(self.bytes),
            last_modified: self
                .built_at
                .duration_since(UNIX_EPOCH)
                .ok()
                .map(|d| d.as_secs()),
            ..IndexStatus::default()
        }
    }
}

/// Files under `target` after ignore rules and include/exclude globs.
fn collect_files(
    target: &Path,
    skip: &[String],
    include: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>, BackendError> {
    let mut overrides = OverrideBuilder::new(target);
    for glob in include {
        overrides
            .add(glob)
            .map_err(|e| BackendError::InvalidPattern(e.to_string()))?;
    }
    for glob in exclude {
        overrides
            .add(&format!("!{glob}"))
            .map_err(|e| BackendError::InvalidPattern(e.to_string()))?;
    }
    let overrides = overrides
        .build()
        .map_err(|e| BackendError::InvalidPattern(e.to_string()))?;

    let skip: Arc<HashSet<String>> = Arc::new(skip.iter().cloned().collect());
    let mut walker = WalkBuilder::new(target);
    walker
        .hidden(false)
        .git_ignore(true)
        .require_git(false)
        .parents(true)
        .overrides(overrides)
        .filter_entry(move |entry| {
            entry.depth() == 0 || !skip.contains(entry.file_name().to_string_lossy().as_ref())
        });

    let mut files = Vec::new();
    for entry in walker.build() {
        match entry {
            Ok(entry) if entry.file_type().is_some_and(|t| t.is_file()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Skipping unreadable entry"),
        }
    }
    files.sort();
    Ok(files)
}

fn read_source(root: &Path, path: &Path) -> Option<SourceFile> {
    let metadata = std::fs::metadata(path).ok()?;
    if metadata.len() > MAX_FILE_BYTES {
        return None;
    }
    // Binary and non-UTF-8 files are skipped.
    let text = std::fs::read_to_string(path).ok()?;
    let display = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned();
    Some(SourceFile::new(display, language_of(path), text))
}

fn build_index(
    root: &Path,
    target: &Path,
    skip: &[String],
    progress: &ProgressSink,
) -> Result<TreeIndex, BackendError> {
    let paths = collect_files(target, skip, &[], &[])?;
    let total = paths.len() as f64;
    let mut files = Vec::with_capacity(paths.len());
    let mut chunks = Vec::new();
    let mut bytes = 0u64;

    for (i, path) in paths.iter().enumerate() {
        let Some(source) = read_source(root, path) else {
            continue;
        };
        progress.report((i + 1) as f64, Some(total), format!("Indexed {}", source.display));

        let file = files.len();
        for first in (0..source.line_count()).step_by(CHUNK_LINES) {
            let last = (first + CHUNK_LINES).min(source.line_count()) - 1;
            chunks.push(Chunk {
                file,
                first,
                last,
                folded: source.lines(first, last).to_lowercase(),
            });
        }
        bytes += source.text.len() as u64;
        files.push(source);
    }

    Ok(TreeIndex {
        files,
        chunks,
        walked: paths.len(),
        built_at: SystemTime::now(),
        bytes,
    })
}

/// Whether any file under `target` changed since `built_at`, or the file
/// set itself changed.
fn is_stale(target: &Path, skip: &[String], index: &TreeIndex) -> Result<bool, BackendError> {
    let paths = collect_files(target, skip, &[], &[])?;
    if paths.len() != index.walked {
        return Ok(true);
    }
    Ok(paths.iter().any(|path| {
        std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_or(true, |modified| modified > index.built_at)
    }))
}

// =============================================================================
// SEARCH
// =============================================================================

fn compile(params: &SearchParams) -> Result<Regex, BackendError> {
    let mut pattern = if params.fixed_string {
        regex::escape(&params.query)
    } else {
        params.query.clone()
    };
    if params.whole_word {
        pattern = format!(r"\b(?:{pattern})\b");
    }
    RegexBuilder::new(&pattern)
        .case_insensitive(params.ignore_case)
        .build()
        .map_err(|e| BackendError::InvalidPattern(e.to_string()))
}

fn regex_search(
    root: &Path,
    target: &Path,
    skip: &[String],
    params: &SearchParams,
) -> Result<Vec<SearchResult>, BackendError> {
    let regex = compile(params)?;
    let paths = collect_files(
        target,
        skip,
        &params.include_patterns,
        &params.exclude_patterns,
    )?;

    let mut results = Vec::new();
    for path in paths {
        let Some(source) = read_source(root, &path) else {
            continue;
        };
        for line in 0..source.line_count() {
            if regex.is_match(source.line(line)) {
                results.push(source.result(line, line, params.context_lines, 1.0));
            }
        }
    }
    Ok(results)
}

fn rank_order(scores: &[(usize, f32)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .1
            .partial_cmp(&scores[a].1)
            .unwrap_or(Ordering::Equal)
            .then(scores[a].0.cmp(&scores[b].0))
    });
    order
}

fn similarity_search(index: &TreeIndex, params: &SearchParams) -> Vec<SearchResult> {
    let terms = terms(&params.query);
    if terms.is_empty() {
        return Vec::new();
    }

    // (chunk, overlap, frequency) for every window containing a term
    let candidates: Vec<(usize, f32, f32)> = index
        .chunks
        .iter()
        .enumerate()
        .filter_map(|(i, chunk)| {
            let present = terms.iter().filter(|t| chunk.folded.contains(t.as_str())).count();
            if present == 0 {
                return None;
            }
            let frequency: usize = terms
                .iter()
                .map(|t| chunk.folded.matches(t.as_str()).count())
                .sum();
            Some((i, present as f32 / terms.len() as f32, frequency as f32))
        })
        .collect();

    let mut scored: Vec<(usize, f32)> = match params.mode {
        SearchMode::Hybrid => {
            let overlap: Vec<(usize, f32)> = candidates.iter().map(|c| (c.0, c.1)).collect();
            let frequency: Vec<(usize, f32)> = candidates.iter().map(|c| (c.0, c.2)).collect();
            let mut fused = vec![0.0f32; candidates.len()];
            for ranking in [rank_order(&overlap), rank_order(&frequency)] {
                for (rank, &slot) in ranking.iter().enumerate() {
                    fused[slot] += 1.0 / (RRF_K + (rank + 1) as f32);
                }
            }
            candidates
                .iter()
                .zip(fused)
                .map(|(c, score)| (c.0, score))
                .collect()
        }
        SearchMode::Semantic | SearchMode::Regex => {
            candidates.iter().map(|c| (c.0, c.1)).collect()
        }
    };

    let threshold = params.threshold.unwrap_or(0.0);
    scored.retain(|(_, score)| *score >= threshold);
    let order = rank_order(&scored);
    let limit = params.top_k.unwrap_or(usize::MAX);

    order
        .into_iter()
        .take(limit)
        .map(|slot| {
            let (chunk_id, score) = scored[slot];
            let chunk = &index.chunks[chunk_id];
            index.files[chunk.file].result(chunk.first, chunk.last, params.context_lines, score)
        })
        .collect()
}

// =============================================================================
// BACKEND
// =============================================================================

/// Search engine over the files below one root directory.
pub struct DirectoryBackend {
    root: PathBuf,
    skip: Vec<String>,
    indexes: RwLock<HashMap<PathBuf, Arc<TreeIndex>>>,
    /// Serializes index builds
    building: tokio::sync::Mutex<()>,
}

impl DirectoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            skip: default_exclude_patterns(),
            indexes: RwLock::new(HashMap::new()),
            building: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BackendError> {
        let candidate = Path::new(path);
        let target = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        if !target.exists() {
            return Err(BackendError::PathNotFound(path.to_string()));
        }
        Ok(target)
    }

    fn cached(&self, target: &Path) -> Option<Arc<TreeIndex>> {
        self.indexes.read().get(target).cloned()
    }

    async fn build(
        &self,
        target: PathBuf,
        progress: ProgressSink,
    ) -> Result<Arc<TreeIndex>, BackendError> {
        let root = self.root.clone();
        let skip = self.skip.clone();
        let key = target.clone();
        let index = tokio::task::spawn_blocking(move || build_index(&root, &target, &skip, &progress))
            .await
            .map_err(|e| BackendError::Failed(format!("index build panicked: {e}")))??;

        info!(
            path = %key.display(),
            files = index.files.len(),
            chunks = index.chunks.len(),
            "Index built"
        );
        let index = Arc::new(index);
        self.indexes.write().insert(key, index.clone());
        Ok(index)
    }

    async fn ensure_index(&self, target: PathBuf) -> Result<Arc<TreeIndex>, BackendError> {
        if let Some(index) = self.cached(&target) {
            return Ok(index);
        }
        let _guard = self.building.lock().await;
        if let Some(index) = self.cached(&target) {
            return Ok(index);
        }
        self.build(target, ProgressSink::disabled()).await
    }
}

#[async_trait]
impl SearchBackend for DirectoryBackend {
    async fn search(&self, params: &SearchParams) -> Result<Vec<SearchResult>, BackendError> {
        let target = self.resolve(&params.path)?;

        if params.mode == SearchMode::Regex {
            let root = self.root.clone();
            let skip = self.skip.clone();
            let params = params.clone();
            return tokio::task::spawn_blocking(move || regex_search(&root, &target, &skip, &params))
                .await
                .map_err(|e| BackendError::Failed(format!("search panicked: {e}")))?;
        }

        let index = self.ensure_index(target).await?;
        Ok(similarity_search(&index, params))
    }

    async fn index_stats(&self, path: &str) -> Result<IndexStatus, BackendError> {
        let target = self.resolve(path)?;
        if let Some(index) = self.cached(&target) {
            return Ok(index.status(path));
        }

        let skip = self.skip.clone();
        let estimated = tokio::task::spawn_blocking(move || collect_files(&target, &skip, &[], &[]))
            .await
            .map_err(|e| BackendError::Failed(e.to_string()))??
            .len();
        Ok(IndexStatus {
            path: path.to_string(),
            index_exists: false,
            estimated_file_count: Some(estimated as u64),
            ..IndexStatus::default()
        })
    }

    async fn reindex(
        &self,
        path: &str,
        force: bool,
        progress: &ProgressSink,
    ) -> Result<(), BackendError> {
        let target = self.resolve(path)?;
        let _guard = self.building.lock().await;

        if !force {
            if let Some(index) = self.cached(&target) {
                let skip = self.skip.clone();
                let check = target.clone();
                let stale = tokio::task::spawn_blocking(move || is_stale(&check, &skip, &index))
                    .await
                    .map_err(|e| BackendError::Failed(e.to_string()))??;
                if !stale {
                    progress.report(1.0, Some(1.0), "Index is up to date");
                    return Ok(());
                }
            }
        }

        self.build(target, progress.clone()).await.map(|_| ())
    }

    fn default_ignore_patterns(&self) -> Vec<String> {
        default_exclude_patterns()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        fs::write(
            dir.path().join("src/net.rs"),
            "use std::io;\n\nfn retry_request() {\n    // retry the request with backoff\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("src/db.py"),
            "def connect():\n    return Database()\n",
        )
        .unwrap();
        fs::write(dir.path().join("target/out.rs"), "fn retry_request() {}\n").unwrap();
        dir
    }

    fn backend(dir: &TempDir) -> DirectoryBackend {
        DirectoryBackend::new(dir.path())
    }

    #[test]
    fn test_source_lines_and_spans() {
        let source = SourceFile::new("a.rs".into(), "rust", "one\ntwo\r\nthree".into());
        assert_eq!(source.line_count(), 3);
        assert_eq!(source.line(1), "two");
        assert_eq!(source.lines(0, 2), "one\ntwo\nthree");

        let hit = source.result(1, 1, 1, 1.0);
        assert_eq!(hit.span.line_start, 2);
        assert_eq!(hit.span.byte_start, 4);
        assert_eq!(hit.snippet, "one\ntwo\nthree");
    }

    #[test]
    fn test_terms_are_deduplicated() {
        assert_eq!(terms("Retry the retry, a request"), vec!["retry", "the", "request"]);
    }

    #[tokio::test]
    async fn test_regex_search_skips_excluded_dirs() {
        let dir = project();
        let params = SearchParams::new(SearchMode::Regex, r"fn \w+", ".");
        let hits = backend(&dir).search(&params).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "src/net.rs");
        assert_eq!(hits[0].span.line_start, 3);
        assert_eq!(hits[0].language, "rust");
    }

    #[tokio::test]
    async fn test_regex_flags_and_globs() {
        let dir = project();
        let mut params = SearchParams::new(SearchMode::Regex, "DATABASE", "src");
        assert!(backend(&dir).search(&params).await.unwrap().is_empty());

        params.ignore_case = true;
        let hits = backend(&dir).search(&params).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].language, "python");

        params.exclude_patterns = vec!["*.py".into()];
        assert!(backend(&dir).search(&params).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_regex_and_missing_path() {
        let dir = project();
        let params = SearchParams::new(SearchMode::Regex, "(unclosed", ".");
        assert!(matches!(
            backend(&dir).search(&params).await,
            Err(BackendError::InvalidPattern(_))
        ));

        let params = SearchParams::new(SearchMode::Regex, "x", "nowhere");
        assert!(matches!(
            backend(&dir).search(&params).await,
            Err(BackendError::PathNotFound(path)) if path == "nowhere"
        ));
    }

    #[tokio::test]
    async fn test_semantic_search_builds_index_on_first_use() {
        let dir = project();
        let backend = backend(&dir);
        assert!(!backend.index_stats(".").await.unwrap().index_exists);

        let params = SearchParams {
            threshold: Some(0.6),
            ..SearchParams::new(SearchMode::Semantic, "retry request", ".")
        };
        let hits = backend.search(&params).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "src/net.rs");
        assert_eq!(hits[0].score, 1.0);

        let status = backend.index_stats(".").await.unwrap();
        assert!(status.index_exists);
        assert_eq!(status.total_files, Some(2));
        assert_eq!(status.total_chunks, Some(2));
    }

    #[tokio::test]
    async fn test_hybrid_scores_are_fused_ranks() {
        let dir = project();
        let params = SearchParams {
            threshold: Some(0.0),
            ..SearchParams::new(SearchMode::Hybrid, "retry database", ".")
        };
        let hits = backend(&dir).search(&params).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[0].score <= 2.0 / (RRF_K + 1.0));
    }

    #[tokio::test]
    async fn test_reindex_reports_progress_and_skips_fresh_index() {
        let dir = project();
        let backend = backend(&dir);

        let (sink, mut rx) = ProgressSink::channel();
        backend.reindex(".", false, &sink).await.unwrap();
        let first = rx.recv().await.unwrap();
        assert_eq!(first.total, Some(2.0));
        assert!(first.message.unwrap().starts_with("Indexed "));

        let (sink, mut rx) = ProgressSink::channel();
        backend.reindex(".", false, &sink).await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap().message.as_deref(),
            Some("Index is up to date")
        );
    }

    #[tokio::test]
    async fn test_skipped_files_do_not_make_the_index_stale() {
        let dir = project();
        fs::write(dir.path().join("src/blob.dat"), [0xff_u8, 0xfe, 0x00, 0x81]).unwrap();
        let backend = backend(&dir);

        let (sink, mut rx) = ProgressSink::channel();
        backend.reindex(".", true, &sink).await.unwrap();
        drop(sink);
        let mut indexed = 0;
        while let Some(event) = rx.recv().await {
            assert_eq!(event.total, Some(3.0));
            indexed += 1;
        }
        assert_eq!(indexed, 2);

        let (sink, mut rx) = ProgressSink::channel();
        backend.reindex(".", false, &sink).await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap().message.as_deref(),
            Some("Index is up to date")
        );
        let status = backend.index_stats(".").await.unwrap();
        assert_eq!(status.total_files, Some(2));
    }
}
