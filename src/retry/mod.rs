//! The retry engine.
//!
//! A [`RetryJob`] invokes a callback until it reports success, until it asks
//! to stop, until a bound runs out, or until someone cancels it:
//!
//! - **Policy**: [`RetryPolicy`] is pure data. The backoff before attempt `n`
//!   is `min(max_delay, n² * backoff_unit)`, with no jitter.
//! - **Bounds**: an attempt limit and a deadline, combined in [`Bounds`].
//! - **Outcomes**: each invocation returns an [`Attempt`], a [`Continuation`]
//!   plus an optional error. No error always means success.
//! - **Cancellation**: a [`CancelHandle`] raises a one-shot signal that the job
//!   checks between attempts, never during one, and waits for the job to stop.
//! - **Observation**: [`RetryObserver`]s are told about every transition.
//!
//! # Quick Start
//!
//! ```rust
//! use steadfast::{Attempt, RetryJob, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let job = RetryJob::from_fn(|| Attempt::retry("connection refused"))
//!     .with_tag("connect")
//!     .with_policy(
//!         RetryPolicy::new()
//!             .with_max_attempts(3)
//!             .with_max_delay(Duration::from_millis(5)),
//!     );
//!
//! let err = job.run().await.unwrap_err();
//! assert!(err.is_failed());
//! assert_eq!(err.attempts(), 3);
//! # });
//! ```
//!
//! # Error Types
//!
//! - [`RetryError::Failed`]: the callback gave up, or attempts ran out
//! - [`RetryError::DeadlineExceeded`]: time ran out between attempts
//! - [`RetryError::Cancelled`]: a cancel request was observed between attempts

mod bounds;
mod cancel;
mod error;
mod job;
mod observer;
mod outcome;
mod policy;
mod run;

pub use bounds::{BoundState, Bounds, Deadline};
pub use cancel::{CancelHandle, CleanupHook, JobState};
pub use error::RetryError;
pub use job::RetryJob;
#[cfg(feature = "tracing")]
pub use observer::TracingObserver;
pub use observer::{
    default_observer, ChannelObserver, NullObserver, RetryEvent, RetryNotice, RetryObserver,
};
pub use outcome::{Attempt, Continuation, Outcome};
pub use policy::{RetryPolicy, DEFAULT_BACKOFF_UNIT, DEFAULT_MAX_DELAY};
pub use run::{retry, retry_times, retry_until};
