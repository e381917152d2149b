//! Core data types for Riff.
//!
//! Everything here is transient: a value lives for one scan invocation and is
//! never persisted. Ordering is the main invariant these types carry:
//!
//! - lines inside [`FileLines`] follow on-disk order
//! - files inside an [`AggregatedResult`] follow resolver order
//! - [`PatternResult::index`] records the manifest position of the pattern

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A directory path followed by a glob suffix, as written in the manifest.
///
/// The directory component is everything before the last path separator and
/// the glob suffix is everything after it. A pattern ending in a separator
/// (`/tmp/data/`) has an empty suffix and selects every file in the
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Pattern(String);

impl Pattern {
    /// Create a pattern from its verbatim text
    pub fn new(text: impl Into<String>) -> Self {
        Pattern(text.into())
    }

    /// The pattern text exactly as it appeared in the manifest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> (&str, &str) {
        match self.0.rfind(std::path::is_separator) {
            Some(0) => (&self.0[..1], &self.0[1..]),
            Some(i) => (&self.0[..i], &self.0[i + 1..]),
            None => (".", &self.0),
        }
    }

    /// Directory whose existence gates resolution.
    pub fn directory(&self) -> &Path {
        Path::new(self.split().0)
    }

    /// File-name glob after the last separator (may be empty).
    pub fn glob_suffix(&self) -> &str {
        self.split().1
    }

    /// Glob expanded in batch mode.
    pub fn batch_glob(&self) -> String {
        match self.glob_suffix() {
            "" => self.glob_in_directory("*"),
            suffix => self.glob_in_directory(suffix),
        }
    }

    /// Glob expanded in query mode: the requested file name inside this
    /// pattern's directory.
    pub fn target_glob(&self, file_name: &str) -> String {
        self.glob_in_directory(file_name)
    }

    /// `name` appended to the directory prefix, with glob metacharacters in
    /// the directory escaped so only `name` is matched as a glob.
    fn glob_in_directory(&self, name: &str) -> String {
        match self.0.rfind(std::path::is_separator) {
            Some(i) => format!("{}{}", glob::Pattern::escape(&self.0[..=i]), name),
            None => name.to_string(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern(s.to_string())
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Pattern(s)
    }
}

/// How resolution of one pattern ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveOutcome {
    /// The directory exists and the glob was expanded (possibly to nothing)
    Matched,
    /// The pattern's directory does not exist
    InvalidPath,
    /// The glob could not be compiled
    GlobError,
}

impl fmt::Display for ResolveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveOutcome::Matched => write!(f, "matched"),
            ResolveOutcome::InvalidPath => write!(f, "invalid path"),
            ResolveOutcome::GlobError => write!(f, "glob error"),
        }
    }
}

/// Concrete files matched by one pattern, in resolver order.
#[derive(Debug, Clone)]
pub struct ResolvedFileSet {
    /// The pattern that was resolved
    pub pattern: Pattern,

    /// Resolution outcome
    pub outcome: ResolveOutcome,

    /// Matched regular files
    pub files: Vec<PathBuf>,
}

impl ResolvedFileSet {
    /// Create an empty set with the given outcome
    pub fn empty(pattern: Pattern, outcome: ResolveOutcome) -> Self {
        ResolvedFileSet {
            pattern,
            outcome,
            files: Vec::new(),
        }
    }

    /// Number of matched files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if nothing matched
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Non-blank lines of one file, in on-disk order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileLines {
    /// File the lines came from
    pub path: PathBuf,

    /// Non-empty lines without their terminators
    pub lines: Vec<String>,

    /// False when the file could not be opened or a read failed partway
    pub complete: bool,
}

impl FileLines {
    /// An empty, incomplete result for a file that could not be opened
    pub fn unreadable(path: impl Into<PathBuf>) -> Self {
        FileLines {
            path: path.into(),
            lines: Vec::new(),
            complete: false,
        }
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if no lines were read
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Lines aggregated across files, keeping per-file boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedResult {
    /// Per-file line sets in resolver order
    pub files: Vec<FileLines>,
}

impl AggregatedResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one file's lines
    pub fn push(&mut self, file: FileLines) {
        self.files.push(file);
    }

    /// Append every file of another result, keeping its order
    pub fn extend(&mut self, other: AggregatedResult) {
        self.files.extend(other.files);
    }

    /// All lines in aggregation order
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .flat_map(|f| f.lines.iter().map(String::as_str))
    }

    /// Total number of lines
    pub fn line_count(&self) -> usize {
        self.files.iter().map(FileLines::len).sum()
    }

    /// Number of files that contributed (including empty ones)
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// True if there are no lines
    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }

    /// Render as a single payload, every line terminated by `\n`.
    ///
    /// Rendering two results and concatenating the strings equals rendering
    /// their concatenation.
    pub fn to_content(&self) -> String {
        let mut out = String::new();
        self.write_content(&mut out);
        out
    }

    /// Append the rendered payload to `out`
    pub fn write_content(&self, out: &mut String) {
        for line in self.lines() {
            out.push_str(line);
            out.push('\n');
        }
    }
}

/// Batch-mode result for one manifest pattern.
#[derive(Debug, Clone, Serialize)]
pub struct PatternResult {
    /// Zero-based position of the pattern in the manifest
    pub index: usize,

    /// The pattern
    pub pattern: Pattern,

    /// How resolution ended
    pub outcome: ResolveOutcome,

    /// Extracted content
    pub result: AggregatedResult,
}

/// Counters for one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    /// Patterns processed
    pub patterns: usize,

    /// Patterns whose directory did not exist
    pub invalid_patterns: usize,

    /// Patterns whose glob could not be expanded
    pub glob_errors: usize,

    /// Files matched across all patterns
    pub files_matched: usize,

    /// Files that could not be opened or were read only partially
    pub files_failed: usize,

    /// Lines delivered to the sink
    pub lines: usize,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl ScanSummary {
    /// Start a new summary stamped with the current time
    pub fn start() -> Self {
        let now = Utc::now();
        ScanSummary {
            patterns: 0,
            invalid_patterns: 0,
            glob_errors: 0,
            files_matched: 0,
            files_failed: 0,
            lines: 0,
            started_at: now,
            finished_at: now,
        }
    }

    /// Fold one pattern result into the counters
    pub fn record(&mut self, result: &PatternResult) {
        self.patterns += 1;
        match result.outcome {
            ResolveOutcome::Matched => {}
            ResolveOutcome::InvalidPath => self.invalid_patterns += 1,
            ResolveOutcome::GlobError => self.glob_errors += 1,
        }
        self.files_matched += result.result.file_count();
        self.files_failed += result.result.files.iter().filter(|f| !f.complete).count();
        self.lines += result.result.line_count();
    }

    /// Stamp the finish time
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Wall-clock duration of the run
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, lines: &[&str]) -> FileLines {
        FileLines {
            path: PathBuf::from(path),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            complete: true,
        }
    }

    #[test]
    fn test_pattern_split() {
        let p = Pattern::new("/tmp/dataA/*.csv");
        assert_eq!(p.directory(), Path::new("/tmp/dataA"));
        assert_eq!(p.glob_suffix(), "*.csv");
        assert_eq!(p.batch_glob(), "/tmp/dataA/*.csv");

        let p = Pattern::new("/tmp/dataA/");
        assert_eq!(p.directory(), Path::new("/tmp/dataA"));
        assert_eq!(p.glob_suffix(), "");
        assert_eq!(p.batch_glob(), "/tmp/dataA/*");

        let p = Pattern::new("/root.txt");
        assert_eq!(p.directory(), Path::new("/"));
        assert_eq!(p.glob_suffix(), "root.txt");

        let p = Pattern::new("*.log");
        assert_eq!(p.directory(), Path::new("."));
        assert_eq!(p.glob_suffix(), "*.log");
    }

    #[test]
    fn test_target_glob() {
        let p = Pattern::new("/tmp/dataA/");
        assert_eq!(p.target_glob("x.csv"), "/tmp/dataA/x.csv");

        let p = Pattern::new("/tmp/dataA/*.csv");
        assert_eq!(p.target_glob("x.csv"), "/tmp/dataA/x.csv");

        let p = Pattern::new("x.csv");
        assert_eq!(p.target_glob("y.csv"), "y.csv");
    }

    #[test]
    fn test_directory_metacharacters_escaped() {
        let p = Pattern::new("/tmp/data[1]/*.csv");
        assert_eq!(p.directory(), Path::new("/tmp/data[1]"));
        assert_eq!(p.batch_glob(), "/tmp/data[[]1[]]/*.csv");
        assert_eq!(p.target_glob("x.csv"), "/tmp/data[[]1[]]/x.csv");

        let p = Pattern::new("/tmp/a*b?/");
        assert_eq!(p.batch_glob(), "/tmp/a[*]b[?]/*");
    }

    #[test]
    fn test_aggregated_content() {
        let mut a = AggregatedResult::new();
        a.push(file("a", &["one", "two"]));
        let mut b = AggregatedResult::new();
        b.push(file("b", &["three"]));

        let separate = a.to_content() + &b.to_content();
        a.extend(b);

        assert_eq!(a.to_content(), separate);
        assert_eq!(a.to_content(), "one\ntwo\nthree\n");
        assert_eq!(a.line_count(), 3);
        assert_eq!(a.file_count(), 2);
    }

    #[test]
    fn test_summary_record() {
        let mut summary = ScanSummary::start();
        let mut result = AggregatedResult::new();
        result.push(file("a", &["x", "y"]));
        result.push(FileLines::unreadable("b"));

        summary.record(&PatternResult {
            index: 0,
            pattern: Pattern::new("/data/*"),
            outcome: ResolveOutcome::Matched,
            result,
        });
        summary.record(&PatternResult {
            index: 1,
            pattern: Pattern::new("/missing/*"),
            outcome: ResolveOutcome::InvalidPath,
            result: AggregatedResult::new(),
        });
        summary.finish();

        assert_eq!(summary.patterns, 2);
        assert_eq!(summary.invalid_patterns, 1);
        assert_eq!(summary.files_matched, 2);
        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.lines, 2);
        assert!(summary.elapsed() >= chrono::Duration::zero());
    }
}
