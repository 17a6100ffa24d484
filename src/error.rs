//! Error types.
//!
//! Small per-concern enums rather than one crate-wide kind bag. Display
//! text is stable; tests assert on it.

use thiserror::Error;

/// Error returned when registering an expectation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    /// The description was empty. Descriptions act as identity keys and
    /// appear in timeout diagnostics, so a blank one is never useful.
    #[error("expectation description may not be empty")]
    EmptyDescription,
    /// An expectation with this description already exists in the current
    /// generation.
    #[error("expectation '{description}' already added")]
    Duplicate {
        /// The offending description.
        description: String,
    },
}

/// Error returned when fulfilling an expectation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FulfillError {
    /// The expectation was already fulfilled. This indicates a test bug;
    /// the whole in-flight generation has been reset as a side effect.
    #[error("expectation '{description}' already fulfilled")]
    AlreadyFulfilled {
        /// Description of the expectation that fired twice.
        description: String,
    },
}

/// A failure surfaced while pumping the owner thread's loop.
///
/// Wraps whatever the loop driver reports; fatal to the current wait.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LoopDriverError {
    message: String,
}

impl LoopDriverError {
    /// Creates a driver error from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error returned by [`WaitCoordinator::wait`](crate::WaitCoordinator::wait).
///
/// Every variant is preceded by a full registry reset, so the next
/// create/wait cycle starts clean.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// A wait session was already active on this registry.
    #[error("a wait is already in progress")]
    ReentrantWait,
    /// `wait` was called from a thread other than the loop's owner.
    #[error("wait must be called on the owner thread")]
    WrongThread,
    /// No expectations were registered before waiting.
    #[error("no expectations registered")]
    NoExpectations,
    /// The deadline passed with expectations still unfulfilled.
    #[error("timed out waiting for expectations {}", quote_join(.unfulfilled))]
    Timeout {
        /// Descriptions still unfulfilled at the deadline, in registration
        /// order.
        unfulfilled: Vec<String>,
    },
    /// The loop driver reported a failure while pumping the owner loop.
    #[error("error running the owner loop: {0}")]
    LoopDriver(#[from] LoopDriverError),
}

fn quote_join(descriptions: &[String]) -> String {
    let mut out = String::new();
    for description in descriptions {
        if !out.is_empty() {
            out.push(',');
        }
        out.push('\'');
        out.push_str(description);
        out.push('\'');
    }
    out
}
