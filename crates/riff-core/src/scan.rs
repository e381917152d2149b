//! Scan orchestration.
//!
//! The [`Scanner`] drives resolution and extraction in two policies:
//!
//! - **Batch** ([`Scanner::run_batch`]): every manifest pattern is queued onto
//!   a bounded Rayon pool sized to the configured worker count. The pool
//!   scope is the completion barrier, so the call returns only after every
//!   unit has finished, and nothing outlives the invocation.
//! - **Query** ([`Scanner::run_query`]): one pattern narrowed to a requested
//!   file name, resolved and extracted synchronously on the caller's thread.
//!
//! Per-pattern and per-file failures never abort a scan; they are reported
//! and produce empty or partial results. Only cancellation stops work early.

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{Result, RiffError};
use crate::extractor::LineExtractor;
use crate::manifest::Manifest;
use crate::report::{ScanEvent, ScanReporter};
use crate::resolver::PathResolver;
use crate::sink::ResultSink;
use crate::types::{AggregatedResult, Pattern, PatternResult, ResolvedFileSet, ScanSummary};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Tuning for a [`Scanner`].
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Batch worker threads (0 = available parallelism)
    pub workers: usize,

    /// Sort glob matches lexicographically
    pub sort_matches: bool,
}

impl ScanOptions {
    /// Take scan options from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        ScanOptions {
            workers: config.scan.workers,
            sort_matches: config.scan.sort_matches,
        }
    }

    /// Set the worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enable or disable match sorting
    pub fn with_sorted_matches(mut self, sort: bool) -> Self {
        self.sort_matches = sort;
        self
    }
}

/// Drives the resolver and extractor over patterns.
#[derive(Clone)]
pub struct Scanner {
    resolver: PathResolver,
    extractor: LineExtractor,
    reporter: Arc<dyn ScanReporter>,
    workers: usize,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("resolver", &self.resolver)
            .field("workers", &self.workers)
            .finish()
    }
}

impl Scanner {
    /// Create a scanner; every component reports to `reporter`.
    pub fn new(options: ScanOptions, reporter: Arc<dyn ScanReporter>) -> Self {
        let workers = match options.workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        };

        Scanner {
            resolver: PathResolver::new(reporter.clone()).sort_matches(options.sort_matches),
            extractor: LineExtractor::new(reporter.clone()),
            reporter,
            workers,
        }
    }

    /// Upper bound on concurrently running batch units
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Resolve one pattern and extract every matched file.
    pub fn scan_pattern(
        &self,
        index: usize,
        pattern: &Pattern,
        cancel: &CancellationToken,
    ) -> Result<PatternResult> {
        self.reporter.report(ScanEvent::PatternStarted {
            pattern: pattern.clone(),
        });

        let set = self.resolver.resolve(pattern, cancel)?;
        let result = self.extract_all(&set, cancel)?;

        Ok(PatternResult {
            index,
            pattern: pattern.clone(),
            outcome: set.outcome,
            result,
        })
    }

    /// Scan every pattern of `manifest` on the bounded pool.
    ///
    /// Each unit's result goes to `sink` as soon as the unit finishes. The
    /// call returns after all units are done. If `cancel` fired while units
    /// were still running, they stop early and `Cancelled` is returned.
    #[instrument(skip_all, fields(patterns = manifest.len()))]
    pub fn run_batch(
        &self,
        manifest: &Manifest,
        sink: &dyn ResultSink,
        cancel: &CancellationToken,
    ) -> Result<ScanSummary> {
        let summary = Mutex::new(ScanSummary::start());
        let interrupted: Mutex<Option<RiffError>> = Mutex::new(None);

        if !manifest.is_empty() {
            let threads = self.workers.min(manifest.len());
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("riff-scan-{}", i))
                .build()
                .map_err(|e| RiffError::Internal(format!("failed to build scan pool: {}", e)))?;

            debug!(threads = threads, "Starting batch scan");

            pool.scope(|scope| {
                for (index, pattern) in manifest.iter().enumerate() {
                    let summary = &summary;
                    let interrupted = &interrupted;
                    scope.spawn(move |_| match self.scan_pattern(index, pattern, cancel) {
                        Ok(result) => {
                            summary.lock().record(&result);
                            sink.accept(result);
                        }
                        Err(e) => {
                            debug!(pattern = %pattern, error = %e, "Pattern skipped");
                            interrupted.lock().get_or_insert(e);
                        }
                    });
                }
            });
        }

        let mut summary = summary.into_inner();
        summary.finish();
        sink.finish(&summary);

        info!(
            patterns = summary.patterns,
            invalid = summary.invalid_patterns,
            files = summary.files_matched,
            lines = summary.lines,
            "Batch scan complete"
        );

        // A deadline passing after the last unit finished does not count
        match interrupted.into_inner() {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    /// Resolve `file_name` within one pattern and extract it.
    pub fn run_query(
        &self,
        pattern: &Pattern,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> Result<AggregatedResult> {
        let set = self.resolver.resolve_target(pattern, file_name, cancel)?;
        self.extract_all(&set, cancel)
    }

    fn extract_all(
        &self,
        set: &ResolvedFileSet,
        cancel: &CancellationToken,
    ) -> Result<AggregatedResult> {
        let mut result = AggregatedResult::new();

        for path in &set.files {
            self.reporter.report(ScanEvent::FileMatched {
                pattern: set.pattern.clone(),
                path: path.clone(),
            });
            result.push(self.extractor.extract(path, cancel)?);
        }

        self.reporter.report(ScanEvent::PatternFinished {
            pattern: set.pattern.clone(),
            files: result.file_count(),
            lines: result.line_count(),
        });

        Ok(result)
    }
}
