//! Error types specific to the query transport.

use std::io;
use thiserror::Error;

/// Result type alias using ServerError
pub type Result<T> = std::result::Result<T, ServerError>;

/// Transport-level failures.
///
/// Scan failures never show up here: the query handler folds them into the
/// response body. These errors concern sockets and framing only.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listener could not be bound
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// A frame exceeded the configured size limit
    #[error("frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },

    /// The peer closed the connection before a response arrived
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A frame could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ServerError {
    /// Returns true for read timeouts used to poll for shutdown
    pub fn is_timeout(&self) -> bool {
        match self {
            ServerError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
