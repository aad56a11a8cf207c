//! Fixtures shared by the integration scenarios

use hmicore_adas::{
    AdasEngagement, AutomationLevel, ConfidenceLevel, SignalMetadata, TakeoverRequest,
    TakeoverUrgency,
};
use hmicore_core::{HmiConfig, ManualClock};
use hmicore_runtime::{HmiRuntime, InboundMessage};
use hmicore_signal::SignalData;
use std::sync::Arc;

/// Signal tick period at the default 20 Hz
pub const TICK_MS: u64 = 50;

/// Install a test-writer subscriber once. Honors `RUST_LOG`.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Runtime on a manual clock, armed for hand-driven ticks.
pub fn manual_runtime() -> (Arc<ManualClock>, HmiRuntime) {
    manual_runtime_with(HmiConfig::default_config())
}

pub fn manual_runtime_with(mut config: HmiConfig) -> (Arc<ManualClock>, HmiRuntime) {
    init_test_logging();
    if config.event_log.session_id.is_none() {
        config.event_log.session_id = Some("integration".to_string());
    }
    let clock = Arc::new(ManualClock::new());
    let runtime = HmiRuntime::new(config, clock.clone()).unwrap();
    runtime.start_manual().unwrap();
    (clock, runtime)
}

/// Advance the clock in whole tick periods, ticking after each.
pub fn run_for(clock: &ManualClock, runtime: &HmiRuntime, ms: u64) {
    for _ in 0..ms / TICK_MS {
        clock.advance_ms(TICK_MS);
        runtime.tick();
    }
}

pub fn metadata(seq: u32) -> SignalMetadata {
    SignalMetadata {
        sequence_number: seq,
        confidence: ConfidenceLevel::High,
        valid: true,
        ..Default::default()
    }
}

pub fn engagement(seq: u32, level: AutomationLevel, engaged: bool) -> AdasEngagement {
    AdasEngagement {
        metadata: metadata(seq),
        level,
        available: true,
        engaged,
        ..Default::default()
    }
}

pub fn takeover(urgency: TakeoverUrgency, countdown_sec: f64) -> TakeoverRequest {
    TakeoverRequest {
        active: true,
        urgency,
        countdown_sec,
        reason: "Construction zone ahead".to_string(),
        required_action: "Take the wheel".to_string(),
        ..Default::default()
    }
}

pub fn signal(id: &str, value: impl Into<SignalData>) -> InboundMessage {
    InboundMessage::Signal {
        id: id.to_string(),
        value: value.into(),
        source_timestamp_ms: None,
    }
}

/// Drive the ADAS state to `EngagedL3` through `Available` and `AvailableL3`.
///
/// Returns the next unused engagement sequence number.
pub fn engage_l3(runtime: &HmiRuntime) -> u32 {
    for (seq, (level, engaged)) in [
        (AutomationLevel::L2, false),
        (AutomationLevel::L3, false),
        (AutomationLevel::L3, true),
    ]
    .into_iter()
    .enumerate()
    {
        let accepted = runtime
            .dispatch(InboundMessage::Engagement(engagement(
                seq as u32 + 1,
                level,
                engaged,
            )))
            .unwrap();
        assert!(accepted);
    }
    4
}
