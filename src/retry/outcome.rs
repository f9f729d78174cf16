//! What a single callback invocation reports, and how the engine reads it.

use std::fmt;

/// Whether the callback wants to be invoked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Continuation {
    /// No further attempts, whatever the error.
    Stop,
    /// Try again if the bounds allow and an error was reported.
    Continue,
}

impl fmt::Display for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuation::Stop => write!(f, "stop"),
            Continuation::Continue => write!(f, "continue"),
        }
    }
}

/// The result of one callback invocation: a continuation plus an optional error.
///
/// The two halves are independent; see [`Attempt::classify`] for how they
/// combine.
///
/// # Examples
///
/// ```rust
/// use steadfast::{Attempt, Outcome};
///
/// assert_eq!(Attempt::<&str>::stop().classify(), Outcome::Success);
/// assert_eq!(Attempt::retry("busy").classify(), Outcome::Retryable("busy"));
/// assert_eq!(Attempt::fail("denied").classify(), Outcome::Terminal("denied"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt<E> {
    /// Whether the callback asks to be invoked again.
    pub continuation: Continuation,
    /// The error from this invocation, if any.
    pub error: Option<E>,
}

impl<E> Attempt<E> {
    /// Pair a continuation with an optional error.
    pub fn new(continuation: Continuation, error: Option<E>) -> Self {
        Self {
            continuation,
            error,
        }
    }

    /// Finished successfully.
    pub fn stop() -> Self {
        Self::new(Continuation::Stop, None)
    }

    /// Finished with an error that must not be retried.
    pub fn fail(error: E) -> Self {
        Self::new(Continuation::Stop, Some(error))
    }

    /// Failed, try again.
    pub fn retry(error: E) -> Self {
        Self::new(Continuation::Continue, Some(error))
    }

    /// Read the attempt. An absent error always means success, even when the
    /// callback asked to continue.
    pub fn classify(self) -> Outcome<E> {
        match (self.continuation, self.error) {
            (_, None) => Outcome::Success,
            (Continuation::Stop, Some(e)) => Outcome::Terminal(e),
            (Continuation::Continue, Some(e)) => Outcome::Retryable(e),
        }
    }
}

/// `Ok` stops, `Err` asks for another attempt.
impl<E> From<Result<(), E>> for Attempt<E> {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Attempt::stop(),
            Err(e) => Attempt::retry(e),
        }
    }
}

impl<E> From<(Continuation, Option<E>)> for Attempt<E> {
    fn from((continuation, error): (Continuation, Option<E>)) -> Self {
        Attempt::new(continuation, error)
    }
}

/// How the engine treats one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<E> {
    /// The job is done.
    Success,
    /// Loop again if the bounds allow.
    Retryable(E),
    /// The job failed; do not retry.
    Terminal(E),
}

impl<E> Outcome<E> {
    /// The error carried by a failed outcome.
    pub fn error(&self) -> Option<&E> {
        match self {
            Outcome::Success => None,
            Outcome::Retryable(e) | Outcome::Terminal(e) => Some(e),
        }
    }

    /// Returns true for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        let cases = [
            (Continuation::Stop, None, Outcome::Success),
            (Continuation::Stop, Some("e"), Outcome::Terminal("e")),
            (Continuation::Continue, None, Outcome::Success),
            (Continuation::Continue, Some("e"), Outcome::Retryable("e")),
        ];

        for (continuation, error, expected) in cases {
            assert_eq!(
                Attempt::new(continuation, error).classify(),
                expected,
                "{} / {:?}",
                continuation,
                error
            );
        }
    }

    #[test]
    fn test_from_result() {
        assert_eq!(Attempt::<&str>::from(Ok(())), Attempt::stop());
        assert_eq!(Attempt::from(Err::<(), _>("x")), Attempt::retry("x"));
    }

    #[test]
    fn test_from_tuple() {
        let attempt: Attempt<&str> = (Continuation::Continue, Some("x")).into();
        assert_eq!(attempt, Attempt::retry("x"));
    }

    #[test]
    fn test_continuation_display() {
        assert_eq!(Continuation::Stop.to_string(), "stop");
        assert_eq!(Continuation::Continue.to_string(), "continue");
    }

    #[test]
    fn test_outcome_error() {
        assert_eq!(Outcome::<&str>::Success.error(), None);
        assert_eq!(Outcome::Retryable("a").error(), Some(&"a"));
        assert!(Outcome::<&str>::Success.is_success());
        assert!(!Outcome::Terminal("b").is_success());
    }
}
