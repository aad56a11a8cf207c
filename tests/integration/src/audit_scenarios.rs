//! Audit trail continuity across a session

use crate::test_utils::*;
use hmicore_adas::{AdasHmiState, AutomationLevel, TakeoverUrgency};
use hmicore_core::{event_types, HmiConfig};
use hmicore_runtime::{HmiRuntime, InboundMessage};
use hmicore_signal::signal_ids;

/// A short drive: engage L3, answer one takeover, drop back to manual.
fn drive(runtime: &HmiRuntime, clock: &hmicore_core::ManualClock) {
    runtime
        .dispatch(signal(signal_ids::VEHICLE_SPEED, 95.0))
        .unwrap();
    engage_l3(runtime);
    run_for(clock, runtime, 200);
    runtime
        .dispatch(InboundMessage::Takeover(takeover(
            TakeoverUrgency::Warning,
            10.0,
        )))
        .unwrap();
    run_for(clock, runtime, 100);
    runtime.dispatch(InboundMessage::AcknowledgeTakeover).unwrap();
}

#[test]
fn test_session_log_is_contiguous_and_verifiable() {
    let (clock, runtime) = manual_runtime();
    drive(&runtime, &clock);
    runtime.stop();

    let log = runtime.event_log();
    assert!(log.verify_integrity().is_ok());

    let events = log.recent_events(usize::MAX);
    assert_eq!(events.first().unwrap().event_type, event_types::SESSION_STARTED);
    assert_eq!(events.last().unwrap().event_type, event_types::SESSION_ENDED);
    for pair in events.windows(2) {
        assert_eq!(pair[1].sequence_id, pair[0].sequence_id + 1);
        assert_eq!(pair[1].previous_checksum, pair[0].checksum);
        assert!(pair[1].timestamp_ms >= pair[0].timestamp_ms);
    }

    // Takeover request is tagged with the state it interrupted
    let request = events
        .iter()
        .find(|e| e.event_type == event_types::TAKEOVER_REQUEST)
        .unwrap();
    assert_eq!(request.context.hmi_state, AdasHmiState::EngagedL3.text());
    assert_eq!(request.context.automation_level, AutomationLevel::L3.text());
}

#[test]
fn test_identical_sessions_share_a_checksum() {
    let (clock_a, runtime_a) = manual_runtime();
    let (clock_b, runtime_b) = manual_runtime();
    drive(&runtime_a, &clock_a);
    drive(&runtime_b, &clock_b);

    let checksum = runtime_a.event_log().session_checksum();
    assert_eq!(checksum.len(), 64);
    assert_eq!(checksum, runtime_b.event_log().session_checksum());

    runtime_b
        .event_log()
        .log_user_action("brightness", "Cluster brightness raised");
    assert_ne!(checksum, runtime_b.event_log().session_checksum());
}

#[test]
fn test_bounded_log_still_verifies() {
    let mut config = HmiConfig::default_config();
    config.event_log.max_events = 16;
    let (_, runtime) = manual_runtime_with(config);

    runtime
        .dispatch(InboundMessage::Engagement(engagement(
            100,
            AutomationLevel::L2,
            false,
        )))
        .unwrap();
    for seq in 0..40 {
        // Every replayed record lands in the log
        runtime
            .dispatch(InboundMessage::Engagement(engagement(
                seq,
                AutomationLevel::L2,
                false,
            )))
            .unwrap();
    }

    let log = runtime.event_log();
    assert_eq!(log.event_count(), 16);
    assert!(log.recent_events(1)[0].sequence_id > 16);
    assert!(log.verify_integrity().is_ok());
    assert!(log.warning_count() >= 40);
}

#[test]
fn test_export_summarises_session() {
    let (clock, runtime) = manual_runtime();
    drive(&runtime, &clock);

    let export = runtime.event_log().export_json();
    assert_eq!(export["session_id"], "integration");
    let count = export["event_count"].as_u64().unwrap() as usize;
    assert_eq!(count, runtime.event_log().event_count());
    assert_eq!(export["events"].as_array().unwrap().len(), count);
    assert_eq!(
        export["session_checksum"],
        runtime.event_log().session_checksum()
    );
}

#[test]
fn test_audit_context_follows_level_without_state_change() {
    let (_, runtime) = manual_runtime();
    for (seq, level) in [(1, AutomationLevel::L2), (2, AutomationLevel::L1)] {
        runtime
            .dispatch(InboundMessage::Engagement(engagement(seq, level, false)))
            .unwrap();
    }
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::Available);

    // Replay lands in the log under the latest level
    runtime
        .dispatch(InboundMessage::Engagement(engagement(
            1,
            AutomationLevel::L2,
            false,
        )))
        .unwrap();
    let last = runtime.event_log().recent_events(1).remove(0);
    assert_eq!(last.event_type, event_types::INTEGRITY_FAILURE);
    assert_eq!(last.context.hmi_state, AdasHmiState::Available.text());
    assert_eq!(last.context.automation_level, AutomationLevel::L1.text());
}
