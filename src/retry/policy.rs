//! Retry policy types and configuration.

use std::time::Duration;

/// Default cap on the backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Default unit the quadratic backoff is measured in.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// A retry policy describing how often and how long a job may retry.
///
/// Policies are pure data - they describe retry behavior but don't execute it.
/// This makes them easy to test, clone, and inspect.
///
/// # Backoff
///
/// The delay before attempt `n` is `min(max_delay, n² * backoff_unit)`. The
/// first attempt (`n = 0`) is never delayed. There is no jitter: the same
/// policy always produces the same schedule.
///
/// # Bounds
///
/// - `max_attempts`: total number of callback invocations allowed; `None`
///   (or `Some(0)`) means unbounded.
/// - Deadlines are per job and live on [`RetryJob`](crate::RetryJob), since
///   an absolute point in time is not reusable configuration.
///
/// # Examples
///
/// ```rust
/// use steadfast::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default()
///     .with_max_attempts(5)
///     .with_max_delay(Duration::from_secs(10));
///
/// assert_eq!(policy.max_attempts(), Some(5));
/// assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
/// assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
/// assert_eq!(policy.delay_for_attempt(9), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
    max_delay: Duration,
    backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with unbounded attempts and the default delay cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of callback invocations.
    ///
    /// `0` is treated as unbounded.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use steadfast::RetryPolicy;
    ///
    /// assert_eq!(RetryPolicy::new().with_max_attempts(3).max_attempts(), Some(3));
    /// assert_eq!(RetryPolicy::new().with_max_attempts(0).max_attempts(), None);
    /// ```
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = (n > 0).then_some(n);
        self
    }

    /// Remove the attempt bound.
    pub fn unbounded(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Set the maximum delay cap.
    ///
    /// Delays will never exceed this value. `Duration::ZERO` disables backoff
    /// entirely.
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    /// Set the unit the quadratic backoff is measured in.
    ///
    /// With the default unit of one second, attempt 3 waits 9 seconds.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Get the maximum number of attempts, `None` when unbounded.
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts.filter(|n| *n > 0)
    }

    /// Get the maximum delay cap.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Get the backoff unit.
    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Calculate the delay before attempt N (0-indexed).
    ///
    /// Saturates at `max_delay` rather than overflowing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use steadfast::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new().with_max_delay(Duration::from_secs(30));
    ///
    /// assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
    /// assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
    /// assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(25));
    /// assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(30));
    /// ```
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let squared = attempt.saturating_mul(attempt);
        self.backoff_unit
            .saturating_mul(squared)
            .min(self.max_delay)
    }

    /// Validate the policy.
    ///
    /// A zero backoff unit with a non-zero cap is almost always a unit
    /// mix-up, so it is rejected.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.backoff_unit.is_zero() && !self.max_delay.is_zero() {
            Err("RetryPolicy backoff_unit must be non-zero when max_delay is set")
        } else {
            Ok(())
        }
    }
}
