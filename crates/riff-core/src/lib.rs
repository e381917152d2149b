//! # Riff Core Library
//!
//! This crate delivers the lines of flat files selected by a manifest of
//! directory/glob patterns. It has no opinion about transports or output:
//! results flow to a pluggable [`ResultSink`] in batch mode and to a
//! [`FileDataResponse`] in query mode.
//!
//! ## Architecture
//!
//! - **Manifest** (`manifest`): ordered pattern list loaded from a text file
//! - **Resolver** (`resolver`): directory check and glob expansion per pattern
//! - **Extractor** (`extractor`): non-blank lines of one file, in order
//! - **Scan** (`scan`): bounded concurrent batch policy and synchronous query policy
//! - **Query** (`query`): request/response contract with unique request ids
//! - **Report** (`report`) and **Sink** (`sink`): injected event and result receivers
//! - **Cancel** (`cancel`): cooperative cancellation with deadlines
//! - **Config** (`config`): configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use riff_core::{
//!     CancellationToken, LoggingReporter, Manifest, ScanOptions, Scanner, WriterSink,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let manifest = Manifest::read(Path::new("paths.txt"))?;
//! let scanner = Scanner::new(ScanOptions::default(), Arc::new(LoggingReporter::new()));
//! let sink = WriterSink::new(std::io::stdout());
//!
//! let summary = scanner.run_batch(&manifest, &sink, &CancellationToken::new())?;
//! println!("{} lines", summary.lines);
//! # Ok::<(), riff_core::RiffError>(())
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod extractor;
pub mod manifest;
pub mod query;
pub mod report;
pub mod resolver;
pub mod scan;
pub mod sink;
pub mod types;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use config::Config;
pub use error::{CancelReason, FailureKind, Result, RiffError};
pub use extractor::LineExtractor;
pub use manifest::Manifest;
pub use query::{FileDataRequest, FileDataResponse, QueryHandler, RequestId, ResponseBody};
pub use report::{ChannelReporter, LoggingReporter, NullReporter, ScanEvent, ScanReporter};
pub use resolver::PathResolver;
pub use scan::{ScanOptions, Scanner};
pub use sink::{ChannelSink, CollectingSink, ResultSink, WriterSink};
pub use types::{
    AggregatedResult, FileLines, Pattern, PatternResult, ResolveOutcome, ResolvedFileSet,
    ScanSummary,
};
