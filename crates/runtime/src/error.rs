//! Runtime error types

use hmicore_core::CoreError;
use hmicore_sched::SchedulerError;
use hmicore_signal::SignalError;
use thiserror::Error;

/// Errors surfaced by runtime construction and message dispatch.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Malformed inbound message: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
