//! Cancellation of a running retry job.
//!
//! Every job owns two one-shot signals. `cancel` is raised by any number of
//! [`CancelHandle`]s and read by the attempt loop at its wait between
//! attempts. `finished` is raised by the loop when it exits (or when its
//! future is dropped), which is what [`CancelHandle::cancel`] waits on.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

/// Cleanup action run once, on the job's task, when cancellation is observed.
pub type CleanupHook<E> = Box<dyn FnOnce() -> Result<(), E> + Send>;

/// Where a job is in its lifecycle.
///
/// `Succeeded`, `Failed`, `DeadlineExceeded` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// `run` has not been called yet.
    NotStarted,
    /// The attempt loop is running.
    Running,
    /// The callback reported success.
    Succeeded,
    /// The callback failed terminally or the attempt budget ran out.
    Failed,
    /// The deadline passed.
    DeadlineExceeded,
    /// Cancellation was observed, or the job was dropped before finishing.
    Cancelled,
}

impl JobState {
    /// Returns true for the four terminal states.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::NotStarted | JobState::Running)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => JobState::NotStarted,
            1 => JobState::Running,
            2 => JobState::Succeeded,
            3 => JobState::Failed,
            4 => JobState::DeadlineExceeded,
            _ => JobState::Cancelled,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            JobState::NotStarted => 0,
            JobState::Running => 1,
            JobState::Succeeded => 2,
            JobState::Failed => 3,
            JobState::DeadlineExceeded => 4,
            JobState::Cancelled => 5,
        }
    }
}

/// State shared between a job and its handles. One per job, never reused.
pub(crate) struct Shared<E> {
    cancel: CancellationToken,
    finished: CancellationToken,
    state: AtomicU8,
    cleanup: Mutex<Option<Result<(), E>>>,
}

impl<E> Shared<E> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            cancel: CancellationToken::new(),
            finished: CancellationToken::new(),
            state: AtomicU8::new(JobState::NotStarted.as_u8()),
            cleanup: Mutex::new(None),
        })
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: JobState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Store the cleanup result. Must happen before `finished` is raised.
    pub(crate) fn record_cleanup(&self, result: Result<(), E>) {
        let mut slot = self.cleanup.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(result);
        }
    }

    /// Arm the guard that raises `finished`.
    pub(crate) fn arm(self: &Arc<Self>) -> FinishGuard<E> {
        FinishGuard {
            shared: Arc::clone(self),
            terminal: JobState::Cancelled,
        }
    }
}

/// Raises `finished` when the job is gone, however it left.
///
/// Armed when the job is built and carried into `run`, so a job dropped
/// before it ever ran still releases its handles.
pub(crate) struct FinishGuard<E> {
    shared: Arc<Shared<E>>,
    terminal: JobState,
}

impl<E> FinishGuard<E> {
    pub(crate) fn shared(&self) -> &Arc<Shared<E>> {
        &self.shared
    }

    /// Mark the job running.
    pub(crate) fn begin(&self) {
        self.shared.set_state(JobState::Running);
    }

    /// Record the state to publish when the guard drops.
    pub(crate) fn settle(&mut self, terminal: JobState) {
        self.terminal = terminal;
    }
}

impl<E> Drop for FinishGuard<E> {
    fn drop(&mut self) {
        self.shared.set_state(self.terminal);
        self.shared.finished.cancel();
    }
}

/// Requests cancellation of one job and waits for it to stop.
///
/// Cheap to clone; every clone talks to the same job. Obtain one with
/// [`RetryJob::cancel_handle`](crate::RetryJob::cancel_handle) before calling
/// `run`.
///
/// Cancellation is only observed between attempts. A callback that is already
/// running is never interrupted; callbacks that want to stop early can watch
/// [`CancelHandle::token`].
pub struct CancelHandle<E> {
    shared: Arc<Shared<E>>,
}

impl<E> CancelHandle<E> {
    pub(crate) fn new(shared: Arc<Shared<E>>) -> Self {
        Self { shared }
    }

    /// Raise the cancellation signal without waiting.
    ///
    /// Idempotent. The job still runs its cleanup hook and stops at its next
    /// wait; use [`cancel`](Self::cancel) to wait for that.
    pub fn request(&self) {
        self.shared.cancel.cancel();
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Returns true once the job's `run` has returned, or the job or its
    /// `run` future has been dropped.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.is_cancelled()
    }

    /// The job's current lifecycle state.
    pub fn state(&self) -> JobState {
        self.shared.state()
    }

    /// A token that fires when cancellation is requested.
    ///
    /// It is a child of the job's signal: cancelling it does not cancel the job.
    pub fn token(&self) -> CancellationToken {
        self.shared.cancel.child_token()
    }

    /// Wait until the job has terminated, without requesting cancellation.
    pub async fn finished(&self) {
        self.shared.finished.cancelled().await
    }
}

impl<E: Clone> CancelHandle<E> {
    /// Cancel the job and wait until it has fully terminated.
    ///
    /// Returns the cleanup hook's result. Every caller sees the same result,
    /// and `Ok(())` when the hook never ran: no hook was configured, or the
    /// job finished before it observed the request.
    ///
    /// Waits for `run` to be called if it has not been yet. A job dropped
    /// without running counts as cancelled and releases the wait.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use steadfast::{Attempt, RetryJob};
    ///
    /// # tokio_test::block_on(async {
    /// let job = RetryJob::from_fn(|| Attempt::retry("unavailable".to_string()))
    ///     .with_cleanup(|| Err("release failed".to_string()));
    /// let handle = job.cancel_handle();
    /// let run = tokio::spawn(job.run());
    ///
    /// assert_eq!(handle.cancel().await, Err("release failed".to_string()));
    /// assert!(run.await.unwrap().unwrap_err().is_cancelled());
    /// # });
    /// ```
    pub async fn cancel(&self) -> Result<(), E> {
        self.request();
        self.finished().await;
        self.shared
            .cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or(Ok(()))
    }

    /// [`cancel`](Self::cancel) for threads outside any async runtime.
    ///
    /// Blocks the calling thread; do not call it from inside a runtime.
    pub fn cancel_blocking(&self) -> Result<(), E> {
        futures::executor::block_on(self.cancel())
    }
}

impl<E> Clone for CancelHandle<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E> fmt::Debug for CancelHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("state", &self.state())
            .field("cancel_requested", &self.is_cancel_requested())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips() {
        for state in [
            JobState::NotStarted,
            JobState::Running,
            JobState::Succeeded,
            JobState::Failed,
            JobState::DeadlineExceeded,
            JobState::Cancelled,
        ] {
            assert_eq!(JobState::from_u8(state.as_u8()), state);
        }
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::DeadlineExceeded.is_terminal());
    }

    #[test]
    fn test_request_is_idempotent() {
        let handle = CancelHandle::<String>::new(Shared::new());
        handle.request();
        handle.request();
        assert!(handle.is_cancel_requested());
        assert!(!handle.is_finished());
        assert_eq!(handle.state(), JobState::NotStarted);
    }

    #[test]
    fn test_child_token_does_not_cancel_job() {
        let handle = CancelHandle::<String>::new(Shared::new());
        let token = handle.token();
        token.cancel();
        assert!(!handle.is_cancel_requested());

        let token = handle.token();
        handle.request();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_dropped_guard_releases_waiters() {
        let shared = Shared::<String>::new();
        let handle = CancelHandle::new(Arc::clone(&shared));

        let guard = shared.arm();
        assert_eq!(handle.state(), JobState::NotStarted);
        guard.begin();
        assert_eq!(handle.state(), JobState::Running);
        drop(guard);

        assert!(handle.is_finished());
        assert_eq!(handle.state(), JobState::Cancelled);
        assert_eq!(handle.cancel_blocking(), Ok(()));
    }

    #[test]
    fn test_unstarted_guard_releases_waiters() {
        let shared = Shared::<String>::new();
        let handle = CancelHandle::new(Arc::clone(&shared));

        drop(shared.arm());

        assert!(handle.is_finished());
        assert_eq!(handle.state(), JobState::Cancelled);
        assert_eq!(handle.cancel_blocking(), Ok(()));
    }

    #[test]
    fn test_first_cleanup_result_wins() {
        let shared = Shared::<String>::new();
        let handle = CancelHandle::new(Arc::clone(&shared));

        let mut guard = shared.arm();
        guard.begin();
        shared.record_cleanup(Err("first".to_string()));
        shared.record_cleanup(Ok(()));
        guard.settle(JobState::Cancelled);
        drop(guard);

        assert_eq!(handle.cancel_blocking(), Err("first".to_string()));
        assert_eq!(handle.cancel_blocking(), Err("first".to_string()));
    }
}
