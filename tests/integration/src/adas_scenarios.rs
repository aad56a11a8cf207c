//! ADAS state gating scenarios

use crate::test_utils::*;
use hmicore_adas::{
    AdasError, AdasEvent, AdasHmiState, AutomationLevel, OddData, OddStatus,
};
use hmicore_core::{event_types, EventCategory};
use hmicore_runtime::InboundMessage;

fn count_type(runtime: &hmicore_runtime::HmiRuntime, event_type: &str) -> usize {
    runtime
        .event_log()
        .recent_events(usize::MAX)
        .iter()
        .filter(|e| e.event_type == event_type)
        .count()
}

#[test]
fn test_engaged_predicate_tracks_record_and_ticks() {
    let (clock, runtime) = manual_runtime();
    let adas = runtime.adas();

    let mut records = vec![
        engagement(1, AutomationLevel::L2, false),
        engagement(2, AutomationLevel::L2, true),
        engagement(3, AutomationLevel::L2, true),
        engagement(4, AutomationLevel::L1, true),
    ];
    records[2].available = false;
    records[3].metadata.valid = false;

    for record in records {
        let expected = record.engaged && record.available && record.metadata.valid;
        runtime
            .dispatch(InboundMessage::Engagement(record))
            .unwrap();
        assert_eq!(adas.is_engaged(), expected);
        run_for(&clock, &runtime, TICK_MS);
        assert_eq!(adas.is_engaged(), expected);
    }

    // Aged past the window the record is invalidated
    for (seq, engaged) in [(5, false), (6, true)] {
        runtime
            .dispatch(InboundMessage::Engagement(engagement(
                seq,
                AutomationLevel::L2,
                engaged,
            )))
            .unwrap();
    }
    assert!(adas.is_engaged());
    run_for(&clock, &runtime, 400);
    assert!(!adas.is_engaged());
    assert!(!adas.engagement().metadata.valid);
}

#[test]
fn test_replayed_records_leave_state_unchanged() {
    let (_, runtime) = manual_runtime();
    let adas_events = runtime.adas().events().record();

    assert!(runtime
        .dispatch(InboundMessage::Engagement(engagement(
            10,
            AutomationLevel::L2,
            false,
        )))
        .unwrap());
    let before = runtime.adas().engagement();

    for seq in [10, 9, 0] {
        let accepted = runtime
            .dispatch(InboundMessage::Engagement(engagement(
                seq,
                AutomationLevel::L2,
                true,
            )))
            .unwrap();
        assert!(!accepted);
    }
    assert_eq!(runtime.adas().engagement(), before);
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::Available);
    assert_eq!(
        adas_events.count(|e| matches!(e, AdasEvent::IntegrityFailure(_))),
        3
    );
    assert_eq!(count_type(&runtime, event_types::INTEGRITY_FAILURE), 3);
}

#[test]
fn test_sequence_wrap_is_accepted() {
    let (_, runtime) = manual_runtime();
    assert!(runtime
        .dispatch(InboundMessage::Engagement(engagement(
            u32::MAX - 2,
            AutomationLevel::L2,
            false,
        )))
        .unwrap());
    assert!(runtime
        .dispatch(InboundMessage::Engagement(engagement(
            3,
            AutomationLevel::L2,
            false,
        )))
        .unwrap());
    // Outside the wrap window a low number is a regression
    assert!(!runtime
        .dispatch(InboundMessage::Engagement(engagement(
            2,
            AutomationLevel::L2,
            false,
        )))
        .unwrap());
}

#[test]
fn test_blocked_transition_keeps_engaged_l3() {
    let (_, runtime) = manual_runtime();
    engage_l3(&runtime);
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::EngagedL3);

    let err = runtime
        .adas()
        .request_state_transition(AdasHmiState::EngagedL2)
        .unwrap_err();
    assert_eq!(
        err,
        AdasError::TransitionBlocked {
            from: AdasHmiState::EngagedL3,
            to: AdasHmiState::EngagedL2,
        }
    );
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::EngagedL3);
    assert_eq!(count_type(&runtime, event_types::TRANSITION_BLOCKED), 1);
}

#[test]
fn test_stale_engagement_reported_once_per_episode() {
    let (clock, runtime) = manual_runtime();
    let adas_events = runtime.adas().events().record();

    runtime
        .dispatch(InboundMessage::Engagement(engagement(
            1,
            AutomationLevel::L2,
            false,
        )))
        .unwrap();
    run_for(&clock, &runtime, 1_000);

    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::Degraded);
    assert_eq!(
        adas_events.count(|e| matches!(e, AdasEvent::StaleStateDetected)),
        1
    );
    let faults = runtime
        .event_log()
        .events_by_category(EventCategory::Fault)
        .into_iter()
        .filter(|e| e.event_type == event_types::FAULT)
        .count();
    assert_eq!(faults, 1);

    // A fresh record recovers and re-arms the latch
    runtime
        .dispatch(InboundMessage::Engagement(engagement(
            2,
            AutomationLevel::L2,
            false,
        )))
        .unwrap();
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::Available);
    run_for(&clock, &runtime, 1_000);
    assert_eq!(
        adas_events.count(|e| matches!(e, AdasEvent::StaleStateDetected)),
        2
    );
}

#[test]
fn test_odd_status_changes_are_audited() {
    let (_, runtime) = manual_runtime();
    let odd = |seq: u32, status: OddStatus| {
        InboundMessage::Odd(OddData {
            metadata: metadata(seq),
            status,
            odd_reasons: vec!["Lane markings faded".to_string()],
            ..Default::default()
        })
    };

    assert!(runtime.dispatch(odd(1, OddStatus::Inside)).unwrap());
    assert!(runtime.dispatch(odd(2, OddStatus::Inside)).unwrap());
    assert!(runtime.dispatch(odd(3, OddStatus::Outside)).unwrap());
    assert!(!runtime.dispatch(odd(3, OddStatus::Inside)).unwrap());

    assert_eq!(runtime.adas().odd_status().status, OddStatus::Outside);
    let odd_events = runtime.event_log().events_by_category(EventCategory::Odd);
    assert_eq!(odd_events.len(), 2);
    assert_eq!(odd_events[1].details, "Lane markings faded");
}
