//! Core error types

use thiserror::Error;

/// Core error type for the HMI core
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration value rejected during validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
