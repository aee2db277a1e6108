//! Error types for HassDouble

use thiserror::Error;
use virtual_scheduler::SchedulerError;

use crate::operation::Operation;

/// Result type alias for host API calls
pub type Result<T> = std::result::Result<T, HassError>;

/// Errors raised by the test double and its harness
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HassError {
    /// The platform offers this operation but the double does not model it
    #[error("'{0}' has not been mocked in HassDouble")]
    UnknownOperation(Operation),

    /// Read of an entity whose state was never set
    #[error("state for '{0}' was never set, use given_that().state_of(..) first")]
    StateNotSet(String),

    /// Automations that were registered with the harness but never initialized
    #[error("automations not initialized: {}", .0.join(", "))]
    NotInitialized(Vec<String>),

    /// Underlying scheduler rejected the request
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Bad argument passed to the double
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl HassError {
    /// Create a new invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Unknown operation, logged as it is raised
    pub(crate) fn unknown(operation: Operation) -> Self {
        debug_assert!(!operation.is_supported(), "'{operation}' is modelled by the double");
        tracing::warn!(operation = %operation, "Operation has not been mocked");
        Self::UnknownOperation(operation)
    }
}
