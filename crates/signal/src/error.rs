//! Signal hub error types

use thiserror::Error;

/// Errors returned by signal registration and update calls.
///
/// Validation outcomes (range, rate, staleness) are not errors; they are
/// reported through the signal's validity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("Signal identifier must not be empty")]
    EmptyId,

    #[error("Signal already registered: {0}")]
    Duplicate(String),

    #[error("Registration closed, hub already accepting updates: {0}")]
    RegistrationClosed(String),

    #[error("Unknown signal: {0}")]
    UnknownSignal(String),
}

/// Result type for signal operations
pub type SignalResult<T> = Result<T, SignalError>;
