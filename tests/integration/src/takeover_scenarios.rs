//! Takeover escalation and MRM scenarios

use crate::test_utils::*;
use hmicore_adas::{
    AdasHmiState, AutomationLevel, TakeoverEvent, TakeoverRequest, TakeoverState,
    TakeoverUrgency, MRM_REASON_MAX_ESCALATION, MRM_REASON_TIMEOUT,
};
use hmicore_core::{event_types, EventCategory, ManualClock};
use hmicore_runtime::{HmiRuntime, InboundMessage};

/// Tick for `ms` while the producer keeps the L3 engagement record fresh.
fn run_engaged(clock: &ManualClock, runtime: &HmiRuntime, seq: &mut u32, ms: u64) {
    for _ in 0..ms / TICK_MS {
        runtime
            .dispatch(InboundMessage::Engagement(engagement(
                *seq,
                AutomationLevel::L3,
                true,
            )))
            .unwrap();
        *seq += 1;
        run_for(clock, runtime, TICK_MS);
    }
}

fn takeover_log(runtime: &HmiRuntime, event_type: &str) -> Vec<hmicore_core::Event> {
    runtime
        .event_log()
        .events_by_category(EventCategory::Takeover)
        .into_iter()
        .filter(|e| e.event_type == event_type)
        .collect()
}

#[test]
fn test_unanswered_warning_ends_in_single_mrm() {
    let (clock, runtime) = manual_runtime();
    let mut seq = engage_l3(&runtime);
    let takeover_events = runtime.takeover().events().record();

    runtime
        .dispatch(InboundMessage::Takeover(takeover(
            TakeoverUrgency::Warning,
            0.5,
        )))
        .unwrap();
    assert_eq!(runtime.takeover().state(), TakeoverState::RequestActive);
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::TakeoverRequested);

    // Under the critical threshold from the first tick
    run_engaged(&clock, &runtime, &mut seq, TICK_MS);
    assert_eq!(
        runtime.takeover().state(),
        TakeoverState::CriticalEscalation
    );

    run_engaged(&clock, &runtime, &mut seq, 500);
    assert_eq!(runtime.takeover().state(), TakeoverState::MrmInitiated);
    assert_eq!(runtime.takeover().remaining_countdown(), 0.0);
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::MrmActive);

    // Further ticks and requests change nothing
    run_engaged(&clock, &runtime, &mut seq, 1_000);
    runtime
        .dispatch(InboundMessage::Takeover(takeover(
            TakeoverUrgency::Advisory,
            10.0,
        )))
        .unwrap();
    assert_eq!(runtime.takeover().state(), TakeoverState::MrmInitiated);

    let mrm: Vec<_> = takeover_events
        .events()
        .into_iter()
        .filter_map(|e| match e {
            TakeoverEvent::MrmStarted { reason } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(mrm, vec![MRM_REASON_TIMEOUT.to_string()]);

    let logged = takeover_log(&runtime, event_types::MRM_STARTED);
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].details, MRM_REASON_TIMEOUT);
    assert_eq!(takeover_log(&runtime, event_types::TAKEOVER_REQUEST).len(), 1);
}

#[test]
fn test_escalation_ladder_without_countdown() {
    let (clock, runtime) = manual_runtime();
    runtime
        .dispatch(InboundMessage::Takeover(takeover(
            TakeoverUrgency::Advisory,
            0.0,
        )))
        .unwrap();
    assert_eq!(runtime.takeover().state(), TakeoverState::PreWarning);

    let mut seen = vec![runtime.takeover().state()];
    for _ in 0..(21_000 / TICK_MS) {
        run_for(&clock, &runtime, TICK_MS);
        let state = runtime.takeover().state();
        if seen.last() != Some(&state) {
            seen.push(state);
        }
    }
    assert_eq!(
        seen,
        vec![
            TakeoverState::PreWarning,
            TakeoverState::RequestActive,
            TakeoverState::Escalated,
            TakeoverState::CriticalEscalation,
            TakeoverState::MrmInitiated,
        ]
    );
    assert_eq!(runtime.takeover().escalation_level(), 3);

    let escalations = takeover_log(&runtime, event_types::TAKEOVER_ESCALATION);
    assert_eq!(escalations.len(), 2);
    let mrm = takeover_log(&runtime, event_types::MRM_STARTED);
    assert_eq!(mrm[0].details, MRM_REASON_MAX_ESCALATION);
}

#[test]
fn test_driver_acknowledgement_hands_back_control() {
    let (clock, runtime) = manual_runtime();
    let mut seq = engage_l3(&runtime);

    runtime
        .dispatch(InboundMessage::Takeover(takeover(
            TakeoverUrgency::Warning,
            8.0,
        )))
        .unwrap();
    run_engaged(&clock, &runtime, &mut seq, 1_000);
    assert!(runtime.takeover().remaining_countdown() <= 7.0);
    assert!(runtime.takeover().is_active());

    assert!(runtime
        .dispatch(InboundMessage::AcknowledgeTakeover)
        .unwrap());
    assert_eq!(runtime.takeover().state(), TakeoverState::Completed);
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::Available);
    assert_eq!(takeover_log(&runtime, event_types::TAKEOVER_COMPLETED).len(), 1);

    // Nothing left to acknowledge
    assert!(!runtime
        .dispatch(InboundMessage::AcknowledgeTakeover)
        .unwrap());
    assert_eq!(
        runtime
            .event_log()
            .events_by_category(EventCategory::UserAction)
            .len(),
        2
    );
}

#[test]
fn test_withdrawn_request_restores_l3() {
    let (_, runtime) = manual_runtime();
    engage_l3(&runtime);

    runtime
        .dispatch(InboundMessage::Takeover(takeover(
            TakeoverUrgency::Advisory,
            30.0,
        )))
        .unwrap();
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::TakeoverRequested);

    runtime
        .dispatch(InboundMessage::Takeover(TakeoverRequest::default()))
        .unwrap();
    assert_eq!(runtime.takeover().state(), TakeoverState::Inactive);
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::EngagedL3);
    assert_eq!(takeover_log(&runtime, event_types::TAKEOVER_CANCELLED).len(), 1);
}

#[test]
fn test_repeated_request_never_lowers_urgency() {
    let (_, runtime) = manual_runtime();
    runtime
        .dispatch(InboundMessage::Takeover(takeover(
            TakeoverUrgency::Immediate,
            10.0,
        )))
        .unwrap();
    assert_eq!(runtime.takeover().state(), TakeoverState::Escalated);

    runtime
        .dispatch(InboundMessage::Takeover(takeover(
            TakeoverUrgency::Advisory,
            20.0,
        )))
        .unwrap();
    assert_eq!(runtime.takeover().state(), TakeoverState::Escalated);
    assert_eq!(runtime.takeover().remaining_countdown(), 20.0);
}
