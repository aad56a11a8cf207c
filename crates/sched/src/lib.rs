//! Fixed-rate deterministic scheduling for the HMI core.
//!
//! One periodic driver fires on a single logical timeline; every freshness
//! check and state-machine timeout in the workspace is evaluated from its
//! ticks against the shared monotonic clock.

pub mod scheduler;

pub use scheduler::{
    DeterministicScheduler, SchedulerError, SchedulerEvent, SchedulerResult, SchedulerStats,
    TickCallback, TickInfo, DEFAULT_JITTER_THRESHOLD_US, RENDER_TICK_HZ, SIGNAL_TICK_HZ,
};
