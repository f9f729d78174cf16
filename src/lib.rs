//! # Steadfast
//!
//! A retry engine for unreliable operations: network calls, resource
//! acquisition, anything that may need a second try.
//!
//! ## Philosophy
//!
//! Every call site that retries needs the same four answers: how long to wait,
//! when to give up, how to stop early, and how to tell what happened.
//! **Steadfast** answers them once:
//!
//! - **Bounded**: attempt limits and deadlines, with capped quadratic backoff
//! - **Cancellable**: cancel from any task or thread, and know the job has
//!   stopped when the call returns
//! - **Observable**: lifecycle events through `tracing` or an event channel
//! - **Honest**: one result per job, with every error that mattered kept
//!
//! ## Quick Example
//!
//! ```rust
//! use steadfast::{Attempt, RetryJob, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let job = RetryJob::new(|| async {
//!     // Talk to something unreliable here.
//!     Attempt::<String>::stop()
//! })
//! .with_tag("handshake")
//! .with_timeout(Duration::from_secs(5))
//! .with_policy(RetryPolicy::new().with_max_attempts(10));
//!
//! let handle = job.cancel_handle();
//! assert!(job.run().await.is_ok());
//! assert!(handle.is_finished());
//! # });
//! ```
//!
//! ## Features
//!
//! - `tracing` (default): instrument jobs with spans and log through
//!   [`TracingObserver`]
//! - `serde`: (de)serialize [`RetryPolicy`] and [`Continuation`]

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod retry;

// Re-exports
#[cfg(feature = "tracing")]
pub use retry::TracingObserver;
pub use retry::{
    retry, retry_times, retry_until, Attempt, CancelHandle, ChannelObserver, Continuation,
    Deadline, JobState, NullObserver, Outcome, RetryError, RetryEvent, RetryJob, RetryNotice,
    RetryObserver, RetryPolicy,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::retry::{
        Attempt, CancelHandle, Continuation, RetryError, RetryJob, RetryObserver, RetryPolicy,
    };
}
