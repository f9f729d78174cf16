//! Attempt-count and deadline bounds for a single job.

use std::time::Duration;

use tokio::time::Instant;

/// When a job must stop trying.
///
/// A relative deadline is resolved exactly once, when the job starts running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Stop at this point in time.
    At(Instant),
    /// Stop once this much time has passed since the job started.
    After(Duration),
}

impl Deadline {
    /// Resolve to an absolute instant relative to `started`.
    ///
    /// A relative deadline too large to represent is treated as unbounded.
    pub fn resolve(self, started: Instant) -> Option<Instant> {
        match self {
            Deadline::At(at) => Some(at),
            Deadline::After(after) => started.checked_add(after),
        }
    }
}

impl From<Instant> for Deadline {
    fn from(at: Instant) -> Self {
        Deadline::At(at)
    }
}

impl From<Duration> for Deadline {
    fn from(after: Duration) -> Self {
        Deadline::After(after)
    }
}

/// Whether the attempt loop may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundState {
    /// Neither bound has been reached.
    Open,
    /// The attempt count has reached `max_attempts`.
    AttemptsExhausted,
    /// The deadline has passed.
    DeadlinePassed,
}

/// The resolved bounds of one job run.
///
/// Pure: every check takes the current attempt and time as arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    max_attempts: Option<u32>,
    deadline: Option<Instant>,
}

impl Bounds {
    /// Combine an attempt limit and an absolute deadline. `None` means unbounded.
    pub fn new(max_attempts: Option<u32>, deadline: Option<Instant>) -> Self {
        Self {
            max_attempts: max_attempts.filter(|n| *n > 0),
            deadline,
        }
    }

    /// Bounds that never close.
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    /// The absolute deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The attempt limit, if any.
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// True once `attempt` invocations have used up the attempt budget.
    pub fn attempts_exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }

    /// True once `now` is at or past the deadline.
    pub fn deadline_passed(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Time left until the deadline, `None` when unbounded.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Evaluate both bounds. The attempt bound is reported first.
    pub fn evaluate(&self, attempt: u32, now: Instant) -> BoundState {
        if self.attempts_exhausted(attempt) {
            BoundState::AttemptsExhausted
        } else if self.deadline_passed(now) {
            BoundState::DeadlinePassed
        } else {
            BoundState::Open
        }
    }
}
