//! Cancellation signal for shutdown operations.
//!
//! Shutdowns accept an optional [`CancellationToken`]. The token is checked
//! before any work starts and again before each unit of teardown is
//! scheduled. A hook that is already running is never interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

/// A token that signals cancellation to shutdown operations.
///
/// Clones share state: cancelling any clone cancels them all. Child tokens
/// observe their parent's cancellation but cancelling a child leaves the
/// parent untouched.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{CancellationToken, Container};
///
/// let container = Container::new();
/// let token = CancellationToken::new();
/// token.cancel();
///
/// let errors = container.shutdown(Some(&token));
/// assert_eq!(errors.len(), 1);
/// assert!(errors[0].is_cancelled());
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationTokenInner>,
}

struct CancellationTokenInner {
    cancelled: AtomicBool,
    parent: Option<CancellationToken>,
    created_at: Instant,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                parent: None,
                created_at: Instant::now(),
            }),
        }
    }

    /// Creates a child token that will be cancelled when either this token
    /// or the child itself is cancelled.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_lifecycle::CancellationToken;
    ///
    /// let parent_token = CancellationToken::new();
    /// let child_token = parent_token.child_token();
    ///
    /// parent_token.cancel();
    /// assert!(child_token.is_cancelled());
    /// ```
    pub fn child_token(&self) -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
                created_at: Instant::now(),
            }),
        }
    }

    /// Cancels the token.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Returns true if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }

        match self.inner.parent {
            Some(ref parent) => parent.is_cancelled(),
            None => false,
        }
    }

    /// Returns an error if the token is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`CancellationError`] once cancellation has been requested.
    pub fn throw_if_cancelled(&self) -> Result<(), CancellationError> {
        if self.is_cancelled() {
            Err(CancellationError::new("operation was cancelled"))
        } else {
            Ok(())
        }
    }

    /// Returns the elapsed time since this token was created.
    pub fn elapsed(&self) -> Duration {
        self.inner.created_at.elapsed()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Checks an optional token; `None` never cancels.
pub(crate) fn check(token: Option<&CancellationToken>) -> Result<(), CancellationError> {
    match token {
        Some(token) => token.throw_if_cancelled(),
        None => Ok(()),
    }
}

/// Error type for cancelled operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cancellation error: {message}")]
pub struct CancellationError {
    message: String,
}

impl CancellationError {
    /// Creates a new cancellation error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message carried by this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}
