//! Cooperative cancellation for scans.
//!
//! A [`CancellationToken`] is created at the request (or CLI) boundary and
//! passed by reference into resolution and extraction, which poll it between
//! units of blocking work. Tokens may carry a deadline and may be derived from
//! a parent, so cancelling a server's shutdown token also stops every
//! in-flight request scan.

use crate::error::{CancelReason, Result, RiffError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Token for cooperative cancellation of scan work.
///
/// Uses an AtomicBool internally. Clone is cheap and shares state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<CancellationToken>,
}

impl CancellationToken {
    /// Create a new cancellation token (not cancelled, no deadline).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        CancellationToken {
            inner: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                deadline: Instant::now().checked_add(timeout),
                parent: None,
            }),
        }
    }

    /// Derive a token that is cancelled whenever `self` is.
    ///
    /// Cancelling the child does not affect the parent.
    pub fn child(&self) -> Self {
        CancellationToken {
            inner: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                deadline: None,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Derive a child token with its own deadline.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        CancellationToken {
            inner: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                deadline: Instant::now().checked_add(timeout),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// The deadline of this token, if it has one
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Why this token fired, or `None` while it is still live.
    pub fn reason(&self) -> Option<CancelReason> {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return Some(CancelReason::Requested);
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return Some(CancelReason::DeadlineExceeded);
            }
        }
        self.inner.parent.as_ref().and_then(|p| p.reason())
    }

    /// Return `Err(Cancelled)` if this token has fired.
    pub fn check(&self) -> Result<()> {
        match self.reason() {
            Some(reason) => Err(RiffError::cancelled(reason)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());

        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some(CancelReason::Requested));
    }

    #[test]
    fn test_deadline() {
        let token = CancellationToken::with_timeout(Duration::ZERO);
        assert_eq!(token.reason(), Some(CancelReason::DeadlineExceeded));

        let err = token.check().unwrap_err();
        assert!(err.is_cancelled());

        let token = CancellationToken::with_timeout(Duration::from_secs(3600));
        assert!(!token.is_cancelled());
        assert!(token.deadline().is_some());
    }

    #[test]
    fn test_child_follows_parent() {
        let parent = CancellationToken::new();
        let child = parent.child_with_timeout(Duration::from_secs(3600));
        let sibling = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
        assert!(!sibling.is_cancelled());

        parent.cancel();
        assert!(sibling.is_cancelled());
    }
}
