//! Cross-crate scenarios for the HMI core
//!
//! This test suite validates:
//! - signal freshness and degraded-mode aggregation through the runtime
//! - ADAS anti-replay and transition gating end to end
//! - takeover escalation into MRM and its coupling to the ADAS state
//! - audit log continuity across a full session
//! - newline-delimited JSON ingestion

pub mod test_utils;

#[cfg(test)]
mod signal_scenarios;

#[cfg(test)]
mod adas_scenarios;

#[cfg(test)]
mod takeover_scenarios;

#[cfg(test)]
mod audit_scenarios;

#[cfg(test)]
mod ingest_scenarios;
