//! Signal freshness and degraded-mode scenarios

use crate::test_utils::*;
use hmicore_adas::{AdasHmiState, AutomationLevel};
use hmicore_core::{event_types, HmiConfig, ManualClock, SharedClock};
use hmicore_runtime::InboundMessage;
use hmicore_signal::catalog::speed_signal;
use hmicore_signal::{signal_ids, SignalData, SignalHub, SignalHubEvent, SignalValidity};
use std::sync::Arc;

#[test]
fn test_speed_ages_out_after_freshness_window() {
    let clock = Arc::new(ManualClock::new());
    let shared: SharedClock = clock.clone();
    let hub = SignalHub::new(shared);
    hub.register_signal(speed_signal(true)).unwrap();

    assert!(hub.update_signal(signal_ids::VEHICLE_SPEED, 60.0, None).unwrap());
    assert_eq!(
        hub.signal(signal_ids::VEHICLE_SPEED).validity,
        SignalValidity::Valid
    );

    clock.advance_ms(301);
    let recorder = hub.events().record();
    assert_eq!(hub.check_freshness(), 1);
    assert_eq!(
        hub.signal(signal_ids::VEHICLE_SPEED).validity,
        SignalValidity::Stale
    );
    let after_first = recorder.len();
    assert!(after_first > 0);

    // Same instant, no updates: nothing further to report
    assert_eq!(hub.check_freshness(), 0);
    assert_eq!(recorder.len(), after_first);
}

#[test]
fn test_out_of_range_critical_value_is_clamped() {
    let (_, runtime) = manual_runtime();

    let accepted = runtime
        .dispatch(signal(signal_ids::VEHICLE_SPEED, 450.0))
        .unwrap();
    assert!(!accepted);

    let speed = runtime.hub().signal(signal_ids::VEHICLE_SPEED);
    assert_eq!(speed.value, SignalData::Number(400.0));
    assert_eq!(speed.validity, SignalValidity::OutOfRange);
}

#[test]
fn test_implausible_speed_jump_is_invalid() {
    let (clock, runtime) = manual_runtime();

    assert!(runtime
        .dispatch(signal(signal_ids::VEHICLE_SPEED, 60.0))
        .unwrap());
    clock.advance_ms(TICK_MS);
    assert!(!runtime
        .dispatch(signal(signal_ids::VEHICLE_SPEED, 200.0))
        .unwrap());
    assert_eq!(
        runtime.hub().signal(signal_ids::VEHICLE_SPEED).validity,
        SignalValidity::Invalid
    );
}

#[test]
fn test_degraded_mode_round_trip_notifies_once_each_way() {
    let (clock, runtime) = manual_runtime();
    let hub_events = runtime.hub().events().record();

    runtime
        .dispatch(signal(signal_ids::VEHICLE_SPEED, 80.0))
        .unwrap();
    runtime
        .dispatch(InboundMessage::Engagement(engagement(
            1,
            AutomationLevel::L2,
            false,
        )))
        .unwrap();

    // Let speed go stale while the engagement stays fresh
    let mut seq = 2;
    for _ in 0..8 {
        run_for(&clock, &runtime, TICK_MS);
        runtime
            .dispatch(InboundMessage::Engagement(engagement(
                seq,
                AutomationLevel::L2,
                false,
            )))
            .unwrap();
        seq += 1;
    }
    assert!(runtime.hub().is_degraded_mode());
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::Degraded);

    runtime
        .dispatch(signal(signal_ids::VEHICLE_SPEED, 80.0))
        .unwrap();
    assert!(!runtime.hub().is_degraded_mode());
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::Available);

    assert_eq!(
        hub_events.count(|e| matches!(e, SignalHubEvent::DegradedModeChanged(true))),
        1
    );
    assert_eq!(
        hub_events.count(|e| matches!(e, SignalHubEvent::DegradedModeChanged(false))),
        1
    );

    let degraded_logs = runtime
        .event_log()
        .recent_events(usize::MAX)
        .into_iter()
        .filter(|e| e.event_type == event_types::SIGNAL_DEGRADED)
        .count();
    assert_eq!(degraded_logs, 2);
}

#[test]
fn test_signal_loss_can_leave_adas_alone() {
    let mut config = HmiConfig::default_config();
    config.signals.degrade_adas_on_signal_loss = false;
    let (clock, runtime) = manual_runtime_with(config);

    runtime
        .dispatch(signal(signal_ids::VEHICLE_SPEED, 80.0))
        .unwrap();
    runtime
        .dispatch(InboundMessage::Engagement(engagement(
            1,
            AutomationLevel::L2,
            false,
        )))
        .unwrap();
    for seq in 2..11 {
        runtime
            .dispatch(InboundMessage::Engagement(engagement(
                seq,
                AutomationLevel::L2,
                true,
            )))
            .unwrap();
        run_for(&clock, &runtime, TICK_MS);
    }
    assert!(runtime.hub().is_degraded_mode());
    assert!(!runtime.adas().is_degraded());
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::EngagedL2);
}
