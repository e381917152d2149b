//! Error types for Riff core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while the binaries use `anyhow` for convenient
//! error handling at the entry point.
//!
//! Only manifest-level failures and cancellation abort an operation. Problems
//! scoped to a single pattern or file (`InvalidPath`, `FileRead`,
//! `GlobExpansion`) are constructed for reporting purposes and delivered to a
//! [`ScanReporter`](crate::report::ScanReporter); they never stop sibling work.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using RiffError
pub type Result<T> = std::result::Result<T, RiffError>;

/// Core error types for Riff operations.
#[derive(Error, Debug)]
pub enum RiffError {
    // === Manifest Errors ===
    /// The manifest file could not be opened or read
    #[error("manifest unreadable at {path}: {source}")]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Resolution Errors ===
    /// The directory component of a pattern does not exist
    #[error("invalid path '{directory}' for pattern '{pattern}'")]
    InvalidPath { pattern: String, directory: PathBuf },

    /// The glob suffix of a pattern could not be expanded
    #[error("glob expansion failed for '{pattern}': {reason}")]
    GlobExpansion { pattern: String, reason: String },

    // === Extraction Errors ===
    /// A matched file could not be opened or read to the end
    #[error("failed to read {path}: {reason}")]
    FileRead { path: PathBuf, reason: String },

    // === Control Flow ===
    /// The operation was cancelled or its deadline passed
    #[error("scan cancelled: {reason}")]
    Cancelled { reason: CancelReason },

    // === Query Errors ===
    /// A query request was malformed
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Internal Errors ===
    /// Internal error that should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

/// Why a cancellation token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Someone called `cancel()` on the token or one of its parents
    Requested,
    /// The token's deadline passed
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested => write!(f, "cancellation requested"),
            CancelReason::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// Failure categories surfaced to query-mode callers.
///
/// This is the stable, serializable face of [`RiffError`] on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ManifestUnreadable,
    InvalidRequest,
    Cancelled,
    DeadlineExceeded,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::ManifestUnreadable => "manifest_unreadable",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::Cancelled => "cancelled",
            FailureKind::DeadlineExceeded => "deadline_exceeded",
            FailureKind::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

impl RiffError {
    /// Returns true if this error came from a cancellation token
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RiffError::Cancelled { .. })
    }

    /// Returns true if this error must abort the whole invocation.
    ///
    /// Per-pattern and per-file errors are isolated and never fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RiffError::InvalidPath { .. }
                | RiffError::GlobExpansion { .. }
                | RiffError::FileRead { .. }
        )
    }

    /// Map this error onto the failure kind reported to query clients
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            RiffError::ManifestUnreadable { .. } => FailureKind::ManifestUnreadable,
            RiffError::InvalidRequest { .. } => FailureKind::InvalidRequest,
            RiffError::Cancelled {
                reason: CancelReason::DeadlineExceeded,
            } => FailureKind::DeadlineExceeded,
            RiffError::Cancelled { .. } => FailureKind::Cancelled,
            _ => FailureKind::Internal,
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        RiffError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(reason: CancelReason) -> Self {
        RiffError::Cancelled { reason }
    }
}
