//! Signal validation, freshness and degraded-mode aggregation.
//!
//! The [`SignalHub`] is the only place vehicle signal validity is decided.
//! Producers push raw values; presentation and state machines read copies.

pub mod catalog;
pub mod definition;
pub mod error;
pub mod hub;
pub mod validator;

pub use catalog::{register_cluster_signals, signal_ids};
pub use definition::{
    SignalData, SignalDefinition, SignalValidity, SignalValue, DEFAULT_FRESHNESS_MS,
};
pub use error::{SignalError, SignalResult};
pub use hub::{SignalHub, SignalHubEvent};
pub use validator::{ValidationResult, ValidationRule};
