//! The attempt loop.
//!
//! One [`RetryJob`] governs one logical operation: it invokes the callback,
//! classifies what came back, and either stops or waits out the backoff
//! before trying again. The wait is the only place the job looks at the
//! outside world: cancellation, the deadline and the backoff race there, in
//! that priority order.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, Ready};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::bounds::{BoundState, Bounds, Deadline};
use super::cancel::{CancelHandle, CleanupHook, FinishGuard, JobState, Shared};
use super::error::RetryError;
use super::observer::{default_observer, RetryEvent, RetryObserver};
use super::outcome::{Attempt, Outcome};
use super::policy::RetryPolicy;

/// A retryable unit of work plus everything that bounds it.
///
/// Built with the `with_*` methods, then consumed by [`run`](Self::run). Take
/// a [`CancelHandle`] first if anything else may need to stop the job. A job
/// dropped without running ends as cancelled, so its handles never hang.
///
/// # Examples
///
/// ```rust
/// use steadfast::{Attempt, RetryJob, RetryPolicy};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let calls = AtomicU32::new(0);
/// let job = RetryJob::new(|| {
///     let n = calls.fetch_add(1, Ordering::SeqCst);
///     async move {
///         if n < 2 {
///             Attempt::retry("not yet")
///         } else {
///             Attempt::stop()
///         }
///     }
/// })
/// .with_tag("warmup")
/// .with_policy(RetryPolicy::new().with_backoff_unit(Duration::from_millis(1)));
///
/// assert!(job.run().await.is_ok());
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # });
/// ```
pub struct RetryJob<F, E> {
    callback: F,
    policy: RetryPolicy,
    deadline: Option<Deadline>,
    tag: Option<String>,
    cleanup: Option<CleanupHook<E>>,
    observer: Arc<dyn RetryObserver<E>>,
    guard: FinishGuard<E>,
}

impl<F, E> RetryJob<F, E>
where
    E: fmt::Display + Send + 'static,
{
    /// Create a job from an async callback.
    ///
    /// Each invocation's future is awaited to completion; the job never
    /// abandons an attempt halfway.
    pub fn new<Fut>(callback: F) -> Self
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<E>>,
    {
        Self {
            callback,
            policy: RetryPolicy::default(),
            deadline: None,
            tag: None,
            cleanup: None,
            observer: default_observer(),
            guard: Shared::new().arm(),
        }
    }
}

impl<E> RetryJob<(), E>
where
    E: fmt::Display + Send + 'static,
{
    /// Create a job from a blocking callback.
    ///
    /// The callback runs on the job's task, so it holds that thread while it
    /// works. Use a multi-threaded runtime if it blocks for long.
    pub fn from_fn<G>(mut callback: G) -> RetryJob<impl FnMut() -> Ready<Attempt<E>>, E>
    where
        G: FnMut() -> Attempt<E>,
    {
        RetryJob::new(move || future::ready(callback()))
    }
}

impl<F, Fut, E> RetryJob<F, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<E>>,
    E: Send + 'static,
{
    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stop trying at `deadline`: an [`Instant`], or a [`Duration`] measured
    /// from when `run` starts.
    pub fn with_deadline(mut self, deadline: impl Into<Deadline>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    /// Stop trying `timeout` after `run` starts.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Deadline::After(timeout))
    }

    /// Label the job in events, logs and errors.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Run `cleanup` once if the job is cancelled. Its result is what
    /// [`CancelHandle::cancel`] returns.
    pub fn with_cleanup<C>(mut self, cleanup: C) -> Self
    where
        C: FnOnce() -> Result<(), E> + Send + 'static,
    {
        self.cleanup = Some(Box::new(cleanup));
        self
    }

    /// Replace the observer.
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: RetryObserver<E> + 'static,
    {
        self.observer = Arc::new(observer);
        self
    }

    /// Replace the observer with a shared one.
    pub fn with_shared_observer(mut self, observer: Arc<dyn RetryObserver<E>>) -> Self {
        self.observer = observer;
        self
    }

    /// A handle that can cancel this job from anywhere.
    pub fn cancel_handle(&self) -> CancelHandle<E> {
        CancelHandle::new(Arc::clone(self.guard.shared()))
    }

    /// The job's tag.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Run the attempt loop to completion.
    ///
    /// Resolves exactly once with `Ok(())` on success or the [`RetryError`]
    /// describing why the job stopped. Dropping the future part-way counts as
    /// cancellation for any waiting [`CancelHandle`]s, but skips the cleanup
    /// hook.
    pub async fn run(self) -> Result<(), RetryError<E>> {
        #[cfg(feature = "tracing")]
        {
            use tracing::Instrument as _;
            let span = tracing::debug_span!("retry_job", tag = self.tag.as_deref().unwrap_or("-"));
            self.execute().instrument(span).await
        }
        #[cfg(not(feature = "tracing"))]
        {
            self.execute().await
        }
    }

    async fn execute(self) -> Result<(), RetryError<E>> {
        let RetryJob {
            mut callback,
            policy,
            deadline,
            tag,
            mut cleanup,
            observer,
            mut guard,
        } = self;

        guard.begin();
        let shared = Arc::clone(guard.shared());
        let started = Instant::now();
        let bounds = Bounds::new(
            policy.max_attempts(),
            deadline.and_then(|d| d.resolve(started)),
        );

        #[cfg(feature = "tracing")]
        if let Err(reason) = policy.validate() {
            tracing::warn!(?policy, reason, "questionable retry policy");
        }

        observer.observe(&RetryEvent::Started {
            tag: tag.as_deref(),
        });

        let mut attempt: u32 = 0;
        let mut last_error: Option<E> = None;

        let result = loop {
            let delay = policy.delay_for_attempt(attempt);

            match pause(shared.cancel_token(), &bounds, delay).await {
                Wake::Proceed => {}
                Wake::Cancelled => {
                    run_cleanup(&mut cleanup, &shared);
                    break Err(RetryError::Cancelled {
                        last_error,
                        attempts: attempt,
                        tag: tag.clone(),
                    });
                }
                Wake::DeadlineExceeded => {
                    break Err(RetryError::DeadlineExceeded {
                        last_error,
                        attempts: attempt,
                        tag: tag.clone(),
                    });
                }
            }

            let outcome = callback().await.classify();
            let invoked = attempt.saturating_add(1);

            match outcome {
                Outcome::Success => break Ok(()),
                Outcome::Terminal(error) => {
                    observer.observe(&RetryEvent::AttemptFailed {
                        tag: tag.as_deref(),
                        attempt,
                        error: &error,
                        next_delay: None,
                        elapsed: started.elapsed(),
                    });
                    break Err(RetryError::Failed {
                        error,
                        attempts: invoked,
                        tag: tag.clone(),
                    });
                }
                Outcome::Retryable(error) => {
                    // A cancel raised during the attempt outranks both bounds.
                    let cancelled = shared.cancel_token().is_cancelled();
                    let bound = bounds.evaluate(invoked, Instant::now());
                    let retrying = !cancelled && bound == BoundState::Open;
                    observer.observe(&RetryEvent::AttemptFailed {
                        tag: tag.as_deref(),
                        attempt,
                        error: &error,
                        next_delay: retrying.then(|| policy.delay_for_attempt(invoked)),
                        elapsed: started.elapsed(),
                    });
                    if cancelled {
                        run_cleanup(&mut cleanup, &shared);
                        break Err(RetryError::Cancelled {
                            last_error: Some(error),
                            attempts: invoked,
                            tag: tag.clone(),
                        });
                    }
                    match bound {
                        BoundState::Open => {
                            last_error = Some(error);
                            attempt = invoked;
                        }
                        BoundState::AttemptsExhausted => {
                            break Err(RetryError::Failed {
                                error,
                                attempts: invoked,
                                tag: tag.clone(),
                            });
                        }
                        BoundState::DeadlinePassed => {
                            break Err(RetryError::DeadlineExceeded {
                                last_error: Some(error),
                                attempts: invoked,
                                tag: tag.clone(),
                            });
                        }
                    }
                }
            }
        };

        let elapsed = started.elapsed();
        match &result {
            Ok(()) => {
                guard.settle(JobState::Succeeded);
                observer.observe(&RetryEvent::Completed {
                    tag: tag.as_deref(),
                    attempts: attempt.saturating_add(1),
                    elapsed,
                });
            }
            Err(error) => {
                guard.settle(terminal_state(error));
                observer.observe(&RetryEvent::Failed {
                    tag: tag.as_deref(),
                    error,
                    elapsed,
                });
            }
        }

        result
    }
}

impl<F, E> fmt::Debug for RetryJob<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryJob")
            .field("tag", &self.tag)
            .field("policy", &self.policy)
            .field("deadline", &self.deadline)
            .field("cleanup", &self.cleanup.is_some())
            .finish_non_exhaustive()
    }
}

fn run_cleanup<E>(cleanup: &mut Option<CleanupHook<E>>, shared: &Shared<E>) {
    let cleaned = cleanup.take().map_or(Ok(()), |hook| hook());
    shared.record_cleanup(cleaned);
}

fn terminal_state<E>(error: &RetryError<E>) -> JobState {
    match error {
        RetryError::Failed { .. } => JobState::Failed,
        RetryError::DeadlineExceeded { .. } => JobState::DeadlineExceeded,
        RetryError::Cancelled { .. } => JobState::Cancelled,
    }
}

/// What ended the wait before an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Proceed,
    Cancelled,
    DeadlineExceeded,
}

/// Wait out `delay` unless cancellation or the deadline comes first.
///
/// Signals that are already due win without waiting. A zero delay still
/// yields once so a concurrent `cancel` can run on the same thread.
async fn pause(cancel: &CancellationToken, bounds: &Bounds, delay: Duration) -> Wake {
    if cancel.is_cancelled() {
        return Wake::Cancelled;
    }
    let remaining = bounds.remaining(Instant::now());
    if remaining == Some(Duration::ZERO) {
        return Wake::DeadlineExceeded;
    }

    let deadline = async {
        match remaining {
            Some(left) => tokio::time::sleep(left).await,
            None => future::pending::<()>().await,
        }
    };
    let backoff = async {
        if delay.is_zero() {
            tokio::task::yield_now().await
        } else {
            tokio::time::sleep(delay).await
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Wake::Cancelled,
        _ = deadline => Wake::DeadlineExceeded,
        _ = backoff => Wake::Proceed,
    }
}
