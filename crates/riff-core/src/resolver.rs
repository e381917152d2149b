//! Pattern resolution.
//!
//! Resolving a pattern means checking that its directory exists and then
//! expanding its glob against the filesystem. Failures are isolated to the
//! pattern: they are reported and produce an empty [`ResolvedFileSet`], and
//! only cancellation is returned as an error.

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::report::{ScanEvent, ScanReporter};
use crate::types::{Pattern, ResolveOutcome, ResolvedFileSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Expands manifest patterns into concrete file paths.
#[derive(Clone)]
pub struct PathResolver {
    reporter: Arc<dyn ScanReporter>,
    sort_matches: bool,
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolver")
            .field("sort_matches", &self.sort_matches)
            .finish()
    }
}

impl PathResolver {
    /// Create a resolver that reports to `reporter`
    pub fn new(reporter: Arc<dyn ScanReporter>) -> Self {
        PathResolver {
            reporter,
            sort_matches: false,
        }
    }

    /// Sort matches lexicographically instead of keeping walker order.
    pub fn sort_matches(mut self, sort: bool) -> Self {
        self.sort_matches = sort;
        self
    }

    /// Resolve a pattern for a batch scan.
    pub fn resolve(
        &self,
        pattern: &Pattern,
        cancel: &CancellationToken,
    ) -> Result<ResolvedFileSet> {
        cancel.check()?;

        if !self.directory_exists(pattern) {
            return Ok(ResolvedFileSet::empty(
                pattern.clone(),
                ResolveOutcome::InvalidPath,
            ));
        }

        self.expand(pattern, &pattern.batch_glob(), None, cancel)
    }

    /// Resolve the requested `file_name` inside a pattern's directory.
    ///
    /// When the pattern carries a glob suffix, matches must satisfy it too,
    /// so a query can only narrow what the manifest exposes.
    pub fn resolve_target(
        &self,
        pattern: &Pattern,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ResolvedFileSet> {
        cancel.check()?;

        if !self.directory_exists(pattern) {
            return Ok(ResolvedFileSet::empty(
                pattern.clone(),
                ResolveOutcome::InvalidPath,
            ));
        }

        let narrow = match pattern.glob_suffix() {
            "" => None,
            suffix => match glob::Pattern::new(suffix) {
                Ok(p) => Some(p),
                Err(e) => {
                    self.reporter.report(ScanEvent::GlobExpansion {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    });
                    return Ok(ResolvedFileSet::empty(
                        pattern.clone(),
                        ResolveOutcome::GlobError,
                    ));
                }
            },
        };

        self.expand(pattern, &pattern.target_glob(file_name), narrow.as_ref(), cancel)
    }

    fn directory_exists(&self, pattern: &Pattern) -> bool {
        let directory = pattern.directory();
        let exists = std::fs::metadata(directory)
            .map(|m| m.is_dir())
            .unwrap_or(false);

        if !exists {
            self.reporter.report(ScanEvent::InvalidPath {
                pattern: pattern.clone(),
                directory: directory.to_path_buf(),
            });
        }
        exists
    }

    fn expand(
        &self,
        pattern: &Pattern,
        glob_text: &str,
        narrow: Option<&glob::Pattern>,
        cancel: &CancellationToken,
    ) -> Result<ResolvedFileSet> {
        let entries = match glob::glob(glob_text) {
            Ok(entries) => entries,
            Err(e) => {
                self.reporter.report(ScanEvent::GlobExpansion {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
                return Ok(ResolvedFileSet::empty(
                    pattern.clone(),
                    ResolveOutcome::GlobError,
                ));
            }
        };

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            cancel.check()?;

            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    self.reporter.report(ScanEvent::GlobEntry {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !path.is_file() {
                continue;
            }

            if let Some(narrow) = narrow {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if !narrow.matches(name) {
                    continue;
                }
            }

            files.push(path);
        }

        if self.sort_matches {
            files.sort();
        }

        Ok(ResolvedFileSet {
            pattern: pattern.clone(),
            outcome: ResolveOutcome::Matched,
            files,
        })
    }
}
