//! Core functionality for the instrument-cluster HMI backend.
//!
//! This crate provides the monotonic time source, notification fan-out,
//! configuration, logging and audit event schema shared by every other
//! crate in the workspace.

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod notify;

pub use clock::{ManualClock, MonotonicClock, SystemClock};
pub use config::{
    AdasConfig, EventLogConfig, HmiConfig, LoggingConfig, PerceptionConfig, SchedulerConfig,
    SignalConfig, TakeoverConfig,
};
pub use error::{CoreError, CoreResult};
pub use event::{
    event_types, Event, EventBuilder, EventCategory, EventContext, EventMetadata, EventSeverity,
};
pub use notify::{EventRecorder, Notifier, Observer, SubscriptionId};

use std::sync::Arc;

/// Shared handle to the process monotonic clock.
pub type SharedClock = Arc<dyn MonotonicClock>;
