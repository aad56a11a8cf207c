//! ADAS presentation state for the instrument cluster.
//!
//! - [`AdasStateService`]: authoritative HMI state machine with anti-replay
//!   and staleness handling
//! - [`TakeoverManager`]: takeover escalation and minimal risk maneuver
//! - [`PerceptionModel`]: lanes, lead vehicle, objects and corridor
//! - [`HmiEventLog`]: checksum-chained audit trail

pub mod engagement;
pub mod error;
pub mod event_log;
pub mod perception;
pub mod state_service;
pub mod takeover;
pub mod transitions;
pub mod types;

pub use engagement::{AdasEngagement, DmsStatus, OddData, TakeoverRequest};
pub use error::{AdasError, AdasResult, EventLogError};
pub use event_log::{HmiEventLog, DEFAULT_MAX_EVENTS};
pub use perception::{
    DrivableCorridor, LaneBoundary, LaneModel, LeadVehicle, ObjectList, PerceivedObject,
    PerceptionEvent, PerceptionModel, Point2D, Position3D, PERCEPTION_FRESHNESS_MS,
};
pub use state_service::{AdasEvent, AdasStateService};
pub use takeover::{
    TakeoverEvent, TakeoverManager, TakeoverState, TakeoverThresholds, MRM_REASON_MAX_ESCALATION,
    MRM_REASON_TIMEOUT,
};
pub use transitions::{
    derive_hmi_state, is_transition_allowed, record_sequence_accepted, sequence_accepted,
};
pub use types::{
    responsibility_owner, AdasHmiState, AttentionState, AutomationLevel, ConfidenceLevel,
    HandsOnState, LaneType, ObjectType, OddStatus, SignalMetadata, TakeoverUrgency,
    WeatherCondition,
};
