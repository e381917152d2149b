//! Scan event reporting.
//!
//! Components never log through ambient global state on their own: every
//! resolver and extractor receives an `Arc<dyn ScanReporter>` and describes
//! what happened as a [`ScanEvent`]. The default [`LoggingReporter`] turns
//! events into `tracing` records; [`ChannelReporter`] forwards them to a
//! channel so embedders and tests can observe them.

use crate::error::RiffError;
use crate::types::Pattern;
use std::fmt;
use std::path::PathBuf;

/// Something notable that happened while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Resolution of a pattern started
    PatternStarted { pattern: Pattern },

    /// The pattern's directory does not exist
    InvalidPath { pattern: Pattern, directory: PathBuf },

    /// The glob could not be compiled
    GlobExpansion { pattern: Pattern, reason: String },

    /// A directory entry could not be read while expanding the glob
    GlobEntry { pattern: Pattern, reason: String },

    /// A file matched the pattern
    FileMatched { pattern: Pattern, path: PathBuf },

    /// A matched file could not be read; `lines_read` lines were kept
    FileRead {
        path: PathBuf,
        reason: String,
        lines_read: usize,
    },

    /// A pattern finished with `files` files and `lines` lines
    PatternFinished {
        pattern: Pattern,
        files: usize,
        lines: usize,
    },
}

impl ScanEvent {
    /// The isolated, non-fatal error this event describes, if any
    pub fn problem(&self) -> Option<RiffError> {
        match self {
            ScanEvent::InvalidPath { pattern, directory } => Some(RiffError::InvalidPath {
                pattern: pattern.to_string(),
                directory: directory.clone(),
            }),
            ScanEvent::GlobExpansion { pattern, reason }
            | ScanEvent::GlobEntry { pattern, reason } => Some(RiffError::GlobExpansion {
                pattern: pattern.to_string(),
                reason: reason.clone(),
            }),
            ScanEvent::FileRead { path, reason, .. } => Some(RiffError::FileRead {
                path: path.clone(),
                reason: reason.clone(),
            }),
            ScanEvent::PatternStarted { .. }
            | ScanEvent::FileMatched { .. }
            | ScanEvent::PatternFinished { .. } => None,
        }
    }

    /// Returns true for events that describe a failure
    pub fn is_problem(&self) -> bool {
        self.problem().is_some()
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEvent::PatternStarted { pattern } => write!(f, "scanning '{}'", pattern),
            ScanEvent::InvalidPath { directory, .. } => {
                write!(f, "Invalid path '{}'.", directory.display())
            }
            ScanEvent::GlobExpansion { pattern, reason } => {
                write!(f, "bad glob '{}': {}", pattern, reason)
            }
            ScanEvent::GlobEntry { pattern, reason } => {
                write!(f, "unreadable entry under '{}': {}", pattern, reason)
            }
            ScanEvent::FileMatched { path, .. } => write!(f, "{}", path.display()),
            ScanEvent::FileRead {
                path,
                reason,
                lines_read,
            } => write!(
                f,
                "error reading '{}' after {} lines: {}",
                path.display(),
                lines_read,
                reason
            ),
            ScanEvent::PatternFinished {
                pattern,
                files,
                lines,
            } => write!(f, "'{}': {} files, {} lines", pattern, files, lines),
        }
    }
}

/// Receiver of scan events.
///
/// Implementations must be `Send + Sync`: batch scans report from several
/// worker threads at once.
pub trait ScanReporter: Send + Sync {
    /// Called for every event, from whichever thread produced it
    fn report(&self, event: ScanEvent);
}

/// A reporter that logs to tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        LoggingReporter
    }
}

impl ScanReporter for LoggingReporter {
    fn report(&self, event: ScanEvent) {
        match &event {
            ScanEvent::PatternStarted { pattern } => {
                tracing::info!(pattern = %pattern, "Processing pattern");
            }
            ScanEvent::InvalidPath { pattern, directory } => {
                tracing::error!(
                    pattern = %pattern,
                    directory = %directory.display(),
                    "Invalid path"
                );
            }
            ScanEvent::GlobExpansion { pattern, reason } => {
                tracing::warn!(pattern = %pattern, reason = %reason, "Glob expansion failed");
            }
            ScanEvent::GlobEntry { pattern, reason } => {
                tracing::warn!(pattern = %pattern, reason = %reason, "Skipping unreadable entry");
            }
            ScanEvent::FileMatched { path, .. } => {
                tracing::debug!(path = %path.display(), "Matched file");
            }
            ScanEvent::FileRead {
                path,
                reason,
                lines_read,
            } => {
                tracing::warn!(
                    path = %path.display(),
                    reason = %reason,
                    lines_read = lines_read,
                    "File read failed"
                );
            }
            ScanEvent::PatternFinished {
                pattern,
                files,
                lines,
            } => {
                tracing::debug!(
                    pattern = %pattern,
                    files = files,
                    lines = lines,
                    "Pattern complete"
                );
            }
        }
    }
}

/// A channel-based reporter implementation
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: crossbeam_channel::Sender<ScanEvent>,
}

impl ChannelReporter {
    /// Create a new channel-based reporter
    pub fn new() -> (Self, crossbeam_channel::Receiver<ScanEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (ChannelReporter { sender }, receiver)
    }
}

impl ScanReporter for ChannelReporter {
    fn report(&self, event: ScanEvent) {
        let _ = self.sender.send(event);
    }
}

/// A reporter that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ScanReporter for NullReporter {
    fn report(&self, _event: ScanEvent) {}
}
