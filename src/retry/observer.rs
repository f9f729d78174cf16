//! Lifecycle notifications for retry jobs.
//!
//! Observers see what a job does but never influence it. Two sinks ship with
//! the crate:
//!
//! - [`TracingObserver`] writes structured log events through `tracing`
//!   (the default when the `tracing` feature is enabled).
//! - [`ChannelObserver`] forwards owned [`RetryNotice`]s over an unbounded
//!   tokio channel, for callers that want an event stream.
//!
//! Any `Fn(&RetryEvent<'_, E>) + Send + Sync` closure is an observer as well.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::error::RetryError;

/// A lifecycle transition of a retry job, borrowed from the running loop.
#[derive(Debug)]
pub enum RetryEvent<'a, E> {
    /// The job entered its attempt loop.
    Started {
        /// The job's tag.
        tag: Option<&'a str>,
    },
    /// One callback invocation reported an error.
    AttemptFailed {
        /// The job's tag.
        tag: Option<&'a str>,
        /// Which attempt failed (0-indexed).
        attempt: u32,
        /// The error from the failed attempt.
        error: &'a E,
        /// Backoff before the next attempt, `None` when the job will not retry.
        next_delay: Option<Duration>,
        /// Total elapsed time since the job started.
        elapsed: Duration,
    },
    /// The job succeeded.
    Completed {
        /// The job's tag.
        tag: Option<&'a str>,
        /// Total number of callback invocations.
        attempts: u32,
        /// Total elapsed time since the job started.
        elapsed: Duration,
    },
    /// The job ended without success.
    Failed {
        /// The job's tag.
        tag: Option<&'a str>,
        /// The error the job returns.
        error: &'a RetryError<E>,
        /// Total elapsed time since the job started.
        elapsed: Duration,
    },
}

impl<E> RetryEvent<'_, E> {
    /// The tag of the job that produced this event.
    pub fn tag(&self) -> Option<&str> {
        match self {
            RetryEvent::Started { tag }
            | RetryEvent::AttemptFailed { tag, .. }
            | RetryEvent::Completed { tag, .. }
            | RetryEvent::Failed { tag, .. } => *tag,
        }
    }

    /// Copy the event out of the loop's borrow.
    pub fn to_notice(&self) -> RetryNotice<E>
    where
        E: Clone,
    {
        let tag = self.tag().map(str::to_owned);
        match self {
            RetryEvent::Started { .. } => RetryNotice::Started { tag },
            RetryEvent::AttemptFailed {
                attempt,
                error,
                next_delay,
                ..
            } => RetryNotice::AttemptFailed {
                tag,
                attempt: *attempt,
                error: (*error).clone(),
                next_delay: *next_delay,
            },
            RetryEvent::Completed { attempts, .. } => RetryNotice::Completed {
                tag,
                attempts: *attempts,
            },
            RetryEvent::Failed { error, .. } => RetryNotice::Failed {
                tag,
                error: (*error).clone(),
            },
        }
    }
}

/// An owned copy of a [`RetryEvent`], as delivered by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryNotice<E> {
    /// See [`RetryEvent::Started`].
    Started {
        /// The job's tag.
        tag: Option<String>,
    },
    /// See [`RetryEvent::AttemptFailed`].
    AttemptFailed {
        /// The job's tag.
        tag: Option<String>,
        /// Which attempt failed (0-indexed).
        attempt: u32,
        /// The error from the failed attempt.
        error: E,
        /// Backoff before the next attempt, `None` when the job will not retry.
        next_delay: Option<Duration>,
    },
    /// See [`RetryEvent::Completed`].
    Completed {
        /// The job's tag.
        tag: Option<String>,
        /// Total number of callback invocations.
        attempts: u32,
    },
    /// See [`RetryEvent::Failed`].
    Failed {
        /// The job's tag.
        tag: Option<String>,
        /// The error the job returned.
        error: RetryError<E>,
    },
}

/// A sink for [`RetryEvent`]s.
///
/// Called synchronously from the job's task, in order. Implementations should
/// not block.
pub trait RetryObserver<E>: Send + Sync {
    /// Receive one event.
    fn observe(&self, event: &RetryEvent<'_, E>);
}

impl<E, F> RetryObserver<E> for F
where
    F: Fn(&RetryEvent<'_, E>) + Send + Sync,
{
    fn observe(&self, event: &RetryEvent<'_, E>) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl<E> RetryObserver<E> for NullObserver {
    fn observe(&self, _event: &RetryEvent<'_, E>) {}
}

/// Writes events through `tracing`.
///
/// `started` and `completed` go to debug, failed attempts to warn, and a job
/// that ends without success to error. Level filtering is left to the
/// installed subscriber.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

#[cfg(feature = "tracing")]
impl<E: fmt::Display> RetryObserver<E> for TracingObserver {
    fn observe(&self, event: &RetryEvent<'_, E>) {
        let tag = event.tag().unwrap_or("-");
        match event {
            RetryEvent::Started { .. } => {
                tracing::debug!(tag, "retry started");
            }
            RetryEvent::AttemptFailed {
                attempt,
                error,
                next_delay,
                elapsed,
                ..
            } => {
                tracing::warn!(
                    tag,
                    attempt,
                    next_delay = ?next_delay,
                    elapsed = ?elapsed,
                    error = %error,
                    "retry attempt failed"
                );
            }
            RetryEvent::Completed {
                attempts, elapsed, ..
            } => {
                tracing::debug!(tag, attempts, elapsed = ?elapsed, "retry completed");
            }
            RetryEvent::Failed { error, elapsed, .. } => {
                tracing::error!(
                    tag,
                    attempts = error.attempts(),
                    elapsed = ?elapsed,
                    error = %error,
                    "retry failed"
                );
            }
        }
    }
}

/// Forwards owned [`RetryNotice`]s to an unbounded channel.
///
/// A dropped receiver is ignored: observation never affects the job.
///
/// # Examples
///
/// ```rust
/// use steadfast::{Attempt, ChannelObserver, RetryJob, RetryNotice};
///
/// # tokio_test::block_on(async {
/// let (observer, mut events) = ChannelObserver::<String>::channel();
/// let job = RetryJob::from_fn(|| Attempt::<String>::stop())
///     .with_tag("ping")
///     .with_observer(observer);
///
/// job.run().await.unwrap();
///
/// assert_eq!(
///     events.recv().await,
///     Some(RetryNotice::Started { tag: Some("ping".to_string()) })
/// );
/// assert_eq!(
///     events.recv().await,
///     Some(RetryNotice::Completed { tag: Some("ping".to_string()), attempts: 1 })
/// );
/// # });
/// ```
pub struct ChannelObserver<E> {
    tx: mpsc::UnboundedSender<RetryNotice<E>>,
}

impl<E> ChannelObserver<E> {
    /// Create an observer and the receiver its notices arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RetryNotice<E>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Forward notices to an existing sender, e.g. one shared by many jobs.
    pub fn from_sender(tx: mpsc::UnboundedSender<RetryNotice<E>>) -> Self {
        Self { tx }
    }
}

impl<E> Clone for ChannelObserver<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E> fmt::Debug for ChannelObserver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelObserver")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<E: Clone + Send> RetryObserver<E> for ChannelObserver<E> {
    fn observe(&self, event: &RetryEvent<'_, E>) {
        let _ = self.tx.send(event.to_notice());
    }
}

/// The observer a job gets when none is configured.
///
/// [`TracingObserver`] with the `tracing` feature, [`NullObserver`] without.
pub fn default_observer<E: fmt::Display + 'static>() -> Arc<dyn RetryObserver<E>> {
    #[cfg(feature = "tracing")]
    {
        Arc::new(TracingObserver)
    }
    #[cfg(not(feature = "tracing"))]
    {
        Arc::new(NullObserver)
    }
}
