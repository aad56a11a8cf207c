//! Newline-delimited JSON ingestion

use crate::test_utils::*;
use hmicore_adas::{AdasHmiState, TakeoverState};
use hmicore_runtime::{InboundMessage, RuntimeError};
use hmicore_core::{HmiConfig, SharedClock, SystemClock};
use hmicore_runtime::HmiRuntime;
use hmicore_signal::{signal_ids, SignalData, SignalError, SignalValidity};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const SESSION: &str = r#"
{"type":"signal","id":"vehicle.speed","value":72.0,"source_timestamp_ms":1000}
{"type":"signal","id":"powertrain.gear","value":"D"}
{"type":"signal","id":"telltale.seatbelt","value":true}
{"type":"engagement","metadata":{"sequence_number":1,"valid":true,"confidence":"High"},"level":"L2","available":true,"engaged":false}
{"type":"engagement","metadata":{"sequence_number":2,"valid":true,"confidence":"High"},"level":"L3","available":true,"engaged":false}
{"type":"engagement","metadata":{"sequence_number":3,"valid":true,"confidence":"High"},"level":"L3","available":true,"engaged":true,"acc_active":true,"lka_active":true}
{"type":"lanes","metadata":{"sequence_number":1,"valid":true,"confidence":"High"},"left":{"is_valid":true,"confidence":"High"},"right":{"is_valid":true,"confidence":"Medium"}}
{"type":"takeover","active":true,"urgency":"Warning","countdown_sec":8.0,"reason":"Exit ahead"}
{"type":"acknowledge_takeover"}
"#;

#[test]
fn test_session_replay() {
    let (_, runtime) = manual_runtime();

    for line in SESSION.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let message = InboundMessage::from_json(line).unwrap();
        assert!(runtime.dispatch(message).unwrap(), "rejected: {}", line);
    }

    let speed = runtime.hub().signal(signal_ids::VEHICLE_SPEED);
    assert_eq!(speed.value, SignalData::Number(72.0));
    assert_eq!(speed.validity, SignalValidity::Valid);
    assert_eq!(speed.source_timestamp_ms, Some(1000));
    assert_eq!(
        runtime.hub().signal(signal_ids::GEAR_POSITION).value,
        SignalData::from("D")
    );
    assert!(runtime.perception().has_valid_lanes());
    assert_eq!(runtime.adas().feature_summary(), "ACC + LKA");
    assert_eq!(runtime.takeover().state(), TakeoverState::Completed);
    assert_eq!(runtime.adas().hmi_state(), AdasHmiState::Available);
}

#[test]
fn test_bad_lines() {
    let (_, runtime) = manual_runtime();

    assert!(InboundMessage::from_json(r#"{"type":"signal","id":"vehicle.speed"}"#).is_err());
    assert!(InboundMessage::from_json("{").is_err());

    let unknown =
        InboundMessage::from_json(r#"{"type":"signal","id":"vehicle.altitude","value":3.0}"#)
            .unwrap();
    assert!(matches!(
        runtime.dispatch(unknown),
        Err(RuntimeError::Signal(SignalError::UnknownSignal(id))) if id == "vehicle.altitude"
    ));

    let bad_gear =
        InboundMessage::from_json(r#"{"type":"signal","id":"powertrain.gear","value":"Z"}"#)
            .unwrap();
    assert!(!runtime.dispatch(bad_gear).unwrap());
    assert_eq!(
        runtime.hub().signal(signal_ids::GEAR_POSITION).validity,
        SignalValidity::NotAvailable
    );
}

#[tokio::test]
async fn test_stream_into_running_runtime() {
    init_test_logging();
    let clock: SharedClock = Arc::new(SystemClock::new());
    let runtime = HmiRuntime::new(HmiConfig::default_config(), clock).unwrap();
    runtime.start().unwrap();

    let mut lines = BufReader::new(SESSION.as_bytes()).lines();
    while let Some(line) = lines.next_line().await.unwrap() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        runtime
            .dispatch(InboundMessage::from_json(line).unwrap())
            .unwrap();
    }

    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    runtime.stop();

    assert!(runtime.scheduler_stats().tick_count >= 1);
    assert_eq!(runtime.takeover().state(), TakeoverState::Completed);
    assert!(runtime.event_log().verify_integrity().is_ok());
}
