//! Error types for VirtualScheduler

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Result type alias for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors that can occur in the VirtualScheduler
///
/// Every variant is a precondition violation raised synchronously to the caller. None of them
/// leaves the scheduler partially mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Attempted to rebase simulated time while callbacks are outstanding
    #[error("cannot set start time while callbacks are scheduled ({pending} pending)")]
    SchedulingState { pending: usize },

    /// Attempted to schedule or advance to a time earlier than the current simulated time
    #[error("cannot {action} in the past (requested {requested}, current time {now})")]
    PastSchedule { action: PastAction, requested: NaiveDateTime, now: NaiveDateTime },

    /// A time computation left chrono's representable range
    #[error("Time out of range: {0}")]
    OutOfRange(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Which operation ran into the past
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PastAction {
    Schedule,
    Advance,
}

impl fmt::Display for PastAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PastAction::Schedule => f.write_str("schedule events"),
            PastAction::Advance => f.write_str("advance to a time"),
        }
    }
}

impl SchedulerError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new out-of-range error
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    pub(crate) fn past(action: PastAction, requested: NaiveDateTime, now: NaiveDateTime) -> Self {
        Self::PastSchedule { action, requested, now }
    }
}
