//! Error types for retry jobs.

use std::fmt;

/// How a retry job ended when it did not succeed.
///
/// Each variant carries only data: the job's tag, how many times the
/// callback was invoked, and the callback error(s) involved.
///
/// # Examples
///
/// ```rust
/// use steadfast::{Attempt, RetryError, RetryJob, RetryPolicy};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let job = RetryJob::from_fn(|| Attempt::retry("always fails")).with_policy(
///     RetryPolicy::new()
///         .with_max_attempts(2)
///         .with_max_delay(Duration::ZERO),
/// );
///
/// match job.run().await {
///     Err(RetryError::Failed { error, attempts, .. }) => {
///         assert_eq!(error, "always fails");
///         assert_eq!(attempts, 2);
///     }
///     other => panic!("expected failure, got {:?}", other),
/// }
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The callback stopped with an error, or the attempt budget ran out.
    Failed {
        /// The error from the final attempt.
        error: E,
        /// Total number of callback invocations.
        attempts: u32,
        /// The job's tag.
        tag: Option<String>,
    },
    /// The deadline passed before the next attempt could start.
    DeadlineExceeded {
        /// The error from the last attempt, if one had failed.
        last_error: Option<E>,
        /// Total number of callback invocations.
        attempts: u32,
        /// The job's tag.
        tag: Option<String>,
    },
    /// Cancellation was requested and observed before the next attempt.
    Cancelled {
        /// The error from the last attempt, if one had failed.
        last_error: Option<E>,
        /// Total number of callback invocations.
        attempts: u32,
        /// The job's tag.
        tag: Option<String>,
    },
}

impl<E> RetryError<E> {
    /// Returns true if the callback failed or the attempt budget ran out.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns true if the deadline ended the job.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }

    /// Returns true if the job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Total number of callback invocations.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Failed { attempts, .. }
            | Self::DeadlineExceeded { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// The job's tag.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Failed { tag, .. }
            | Self::DeadlineExceeded { tag, .. }
            | Self::Cancelled { tag, .. } => tag.as_deref(),
        }
    }

    /// Get a reference to the most recent callback error.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Failed { error, .. } => Some(error),
            Self::DeadlineExceeded { last_error, .. } | Self::Cancelled { last_error, .. } => {
                last_error.as_ref()
            }
        }
    }

    /// Extract the most recent callback error, discarding metadata.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Failed { error, .. } => Some(error),
            Self::DeadlineExceeded { last_error, .. } | Self::Cancelled { last_error, .. } => {
                last_error
            }
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = self.tag() {
            write!(f, "[{}] ", tag)?;
        }
        match self {
            Self::Failed { error, attempts, .. } => {
                write!(f, "failed after {} attempts: {}", attempts, error)
            }
            Self::DeadlineExceeded {
                last_error,
                attempts,
                ..
            } => {
                write!(f, "deadline exceeded after {} attempts", attempts)?;
                match last_error {
                    Some(e) => write!(f, ": {}", e),
                    None => Ok(()),
                }
            }
            Self::Cancelled {
                last_error,
                attempts,
                ..
            } => {
                write!(f, "cancelled after {} attempts", attempts)?;
                match last_error {
                    Some(e) => write!(f, ": {}", e),
                    None => Ok(()),
                }
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last_error().map(|e| e as &(dyn std::error::Error + 'static))
    }
}
