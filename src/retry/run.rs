//! Shorthand for running a job without configuring it first.

use std::fmt;
use std::future::Future;

use tokio::time::Instant;

use super::error::RetryError;
use super::job::RetryJob;
use super::outcome::Attempt;
use super::policy::RetryPolicy;

/// Run `callback` until it stops, with no bound on attempts or time.
pub async fn retry<F, Fut, E>(callback: F) -> Result<(), RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<E>>,
    E: fmt::Display + Send + 'static,
{
    RetryJob::new(callback).run().await
}

/// Run `callback` until it stops or `deadline` passes.
pub async fn retry_until<F, Fut, E>(deadline: Instant, callback: F) -> Result<(), RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<E>>,
    E: fmt::Display + Send + 'static,
{
    RetryJob::new(callback).with_deadline(deadline).run().await
}

/// Run `callback` until it stops or has been invoked `max_attempts` times.
///
/// `0` means unbounded.
///
/// # Examples
///
/// ```rust
/// use steadfast::{retry_times, Attempt};
///
/// # tokio_test::block_on(async {
/// let err = retry_times(1, || async { Attempt::retry("down") })
///     .await
///     .unwrap_err();
///
/// assert_eq!(err.attempts(), 1);
/// assert_eq!(err.into_last_error(), Some("down"));
/// # });
/// ```
pub async fn retry_times<F, Fut, E>(max_attempts: u32, callback: F) -> Result<(), RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<E>>,
    E: fmt::Display + Send + 'static,
{
    RetryJob::new(callback)
        .with_policy(RetryPolicy::new().with_max_attempts(max_attempts))
        .run()
        .await
}
