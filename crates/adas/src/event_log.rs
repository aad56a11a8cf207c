//! Tamper-evident HMI audit log.
//!
//! Every appended event is stamped with a sequence number, the monotonic
//! time, and the HMI state active at the time, then chained to its
//! predecessor with a BLAKE3 checksum. The log is bounded; the oldest events
//! are dropped first.

use crate::error::EventLogError;
use crate::types::{AdasHmiState, AutomationLevel, OddStatus, TakeoverUrgency};
use hmicore_core::notify::lock;
use hmicore_core::{
    event_types, Event, EventBuilder, EventCategory, EventContext, EventSeverity, SharedClock,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, error, info};

pub const DEFAULT_MAX_EVENTS: usize = 10_000;

#[derive(Debug, Default)]
struct LogState {
    events: VecDeque<Event>,
    next_sequence: u64,
    last_checksum: String,
    context: EventContext,
    session_id: Option<String>,
    warning_count: u64,
    error_count: u64,
}

/// Chained checksum over an event's content and its predecessor's checksum.
pub fn compute_checksum(event: &Event) -> String {
    let sequence = event.sequence_id.to_string();
    let timestamp = event.timestamp_ms.to_string();
    let category = format!("{:?}", event.category);
    let severity = format!("{:?}", event.severity);
    let data = event.data.to_canonical_json();

    let mut hasher = blake3::Hasher::new();
    for field in [
        &event.previous_checksum,
        &sequence,
        &timestamp,
        &category,
        &severity,
        &event.event_type,
        &event.summary,
        &event.details,
        &data,
    ] {
        hasher.update(field.as_bytes());
        hasher.update(b"|");
    }
    hex::encode(hasher.finalize().as_bytes())
}

/// Bounded, checksum-chained audit log.
pub struct HmiEventLog {
    clock: SharedClock,
    max_events: usize,
    state: Mutex<LogState>,
}

impl HmiEventLog {
    pub fn new(clock: SharedClock) -> Self {
        Self::with_capacity(clock, DEFAULT_MAX_EVENTS)
    }

    pub fn with_capacity(clock: SharedClock, max_events: usize) -> Self {
        Self {
            clock,
            max_events: max_events.max(1),
            state: Mutex::new(LogState::default()),
        }
    }

    /// Append an event, returning its sequence id.
    ///
    /// Sequence id, timestamp, context and both checksums are assigned here;
    /// any values set by the caller are overwritten.
    pub fn log(&self, mut event: Event) -> u64 {
        let now = self.clock.elapsed_ms();
        let mut state = lock(&self.state);

        event.sequence_id = state.next_sequence;
        event.timestamp_ms = now;
        event.context = state.context.clone();
        event.previous_checksum = state.last_checksum.clone();
        event.checksum = compute_checksum(&event);

        match event.severity {
            EventSeverity::Warning => state.warning_count += 1,
            EventSeverity::Error | EventSeverity::Critical => state.error_count += 1,
            EventSeverity::Debug | EventSeverity::Info => {}
        }

        debug!(
            seq = event.sequence_id,
            event_type = %event.event_type,
            "audit event"
        );
        state.next_sequence += 1;
        state.last_checksum = event.checksum.clone();
        let sequence_id = event.sequence_id;
        state.events.push_back(event);
        while state.events.len() > self.max_events {
            state.events.pop_front();
        }
        sequence_id
    }

    /// Tag subsequent events with the current HMI state and level.
    pub fn set_current_state(&self, state: AdasHmiState, level: AutomationLevel) {
        lock(&self.state).context = EventContext {
            hmi_state: state.text().to_string(),
            automation_level: level.text().to_string(),
        };
    }

    pub fn start_session(&self, session_id: &str) {
        lock(&self.state).session_id = Some(session_id.to_string());
        info!(session_id, "audit session started");
        self.log(
            EventBuilder::new(event_types::SESSION_STARTED, EventCategory::System)
                .summary("Session started")
                .data("session_id", session_id)
                .build(),
        );
    }

    pub fn end_session(&self) {
        let session_id = lock(&self.state).session_id.clone().unwrap_or_default();
        self.log(
            EventBuilder::new(event_types::SESSION_ENDED, EventCategory::System)
                .summary("Session ended")
                .data("session_id", session_id.as_str())
                .build(),
        );
        info!(session_id = %session_id, "audit session ended");
    }

    pub fn session_id(&self) -> Option<String> {
        lock(&self.state).session_id.clone()
    }

    pub fn log_state_change(&self, from: AdasHmiState, to: AdasHmiState, reason: &str) -> u64 {
        self.log(
            EventBuilder::new(event_types::STATE_CHANGE, EventCategory::StateChange)
                .summary(format!("{} -> {}", from.text(), to.text()))
                .details(reason)
                .data("from", format!("{:?}", from))
                .data("to", format!("{:?}", to))
                .build(),
        )
    }

    pub fn log_engagement(&self, engaged: bool, level: AutomationLevel) -> u64 {
        let status = if engaged { "engaged" } else { "standby" };
        self.log(
            EventBuilder::new(event_types::ENGAGEMENT_CHANGE, EventCategory::Engagement)
                .summary(format!("{} {}", level.text(), status))
                .data("engaged", engaged)
                .data("level", format!("{:?}", level))
                .data("status", status)
                .build(),
        )
    }

    /// Critical when the urgency is Immediate or above, otherwise Warning.
    pub fn log_takeover_request(&self, urgency: TakeoverUrgency, reason: &str) -> u64 {
        let severity = if urgency >= TakeoverUrgency::Immediate {
            EventSeverity::Critical
        } else {
            EventSeverity::Warning
        };
        self.log(
            EventBuilder::new(event_types::TAKEOVER_REQUEST, EventCategory::Takeover)
                .severity(severity)
                .summary("Takeover requested")
                .details(reason)
                .data("urgency", format!("{:?}", urgency))
                .build(),
        )
    }

    pub fn log_takeover_escalation(&self, level: u32, urgency: TakeoverUrgency) -> u64 {
        self.log(
            EventBuilder::new(event_types::TAKEOVER_ESCALATION, EventCategory::Takeover)
                .severity(EventSeverity::Warning)
                .summary(format!("Takeover escalated to level {}", level))
                .data("level", level)
                .data("urgency", format!("{:?}", urgency))
                .build(),
        )
    }

    /// Driver response to a takeover request.
    pub fn log_takeover_response(&self, acknowledged: bool) -> u64 {
        let (event_type, summary) = if acknowledged {
            (event_types::TAKEOVER_COMPLETED, "Driver took over")
        } else {
            (event_types::TAKEOVER_CANCELLED, "Takeover request withdrawn")
        };
        self.log(
            EventBuilder::new(event_type, EventCategory::Takeover)
                .summary(summary)
                .data("acknowledged", acknowledged)
                .build(),
        )
    }

    pub fn log_mrm_event(&self, reason: &str) -> u64 {
        error!(reason, "audit: minimal risk maneuver");
        self.log(
            EventBuilder::new(event_types::MRM_STARTED, EventCategory::Takeover)
                .severity(EventSeverity::Critical)
                .summary("Minimal Risk Maneuver")
                .details(reason)
                .data("reason", reason)
                .build(),
        )
    }

    pub fn log_perception_degraded(&self, reason: &str) -> u64 {
        self.log(
            EventBuilder::new(event_types::PERCEPTION_DEGRADED, EventCategory::Perception)
                .severity(EventSeverity::Warning)
                .summary("Perception degraded")
                .details(reason)
                .build(),
        )
    }

    pub fn log_odd_event(&self, status: OddStatus, reason: &str) -> u64 {
        let severity = if status == OddStatus::Outside {
            EventSeverity::Warning
        } else {
            EventSeverity::Info
        };
        self.log(
            EventBuilder::new(event_types::ODD_CHANGE, EventCategory::Odd)
                .severity(severity)
                .summary(format!("ODD status {:?}", status))
                .details(reason)
                .data("status", format!("{:?}", status))
                .build(),
        )
    }

    pub fn log_fault(&self, component: &str, description: &str, severity: EventSeverity) -> u64 {
        self.log(
            EventBuilder::new(event_types::FAULT, EventCategory::Fault)
                .severity(severity)
                .summary(format!("{} fault", component))
                .details(description)
                .data("component", component)
                .build(),
        )
    }

    pub fn log_security_event(&self, event_type: &str, description: &str) -> u64 {
        self.log(
            EventBuilder::new(event_type, EventCategory::Security)
                .severity(EventSeverity::Warning)
                .summary(description)
                .build(),
        )
    }

    pub fn log_user_action(&self, action: &str, details: &str) -> u64 {
        self.log(
            EventBuilder::new(event_types::USER_ACTION, EventCategory::UserAction)
                .summary(action)
                .details(details)
                .build(),
        )
    }

    /// Most recent `count` events, oldest first.
    pub fn recent_events(&self, count: usize) -> Vec<Event> {
        let state = lock(&self.state);
        let skip = state.events.len().saturating_sub(count);
        state.events.iter().skip(skip).cloned().collect()
    }

    pub fn events_by_category(&self, category: EventCategory) -> Vec<Event> {
        lock(&self.state)
            .events
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }

    /// Events with `start_ms <= timestamp_ms <= end_ms`.
    pub fn events_in_range(&self, start_ms: u64, end_ms: u64) -> Vec<Event> {
        lock(&self.state)
            .events
            .iter()
            .filter(|e| (start_ms..=end_ms).contains(&e.timestamp_ms))
            .cloned()
            .collect()
    }

    pub fn event_count(&self) -> usize {
        lock(&self.state).events.len()
    }

    pub fn warning_count(&self) -> u64 {
        lock(&self.state).warning_count
    }

    /// Error and Critical events.
    pub fn error_count(&self) -> u64 {
        lock(&self.state).error_count
    }

    /// Recompute every retained checksum and check each chain link.
    ///
    /// The oldest retained event links to an evicted event, so only its own
    /// checksum is verified unless it is the first event ever logged.
    pub fn verify_integrity(&self) -> Result<(), EventLogError> {
        let state = lock(&self.state);
        let mut previous: Option<&Event> = None;

        for event in &state.events {
            if compute_checksum(event) != event.checksum {
                return Err(EventLogError::ChecksumMismatch {
                    sequence_id: event.sequence_id,
                });
            }

            let expected = match previous {
                Some(prev) => Some(prev.checksum.as_str()),
                None if event.sequence_id == 0 => Some(""),
                None => None,
            };
            if let Some(expected) = expected {
                if event.previous_checksum != expected {
                    return Err(EventLogError::ChainBroken {
                        sequence_id: event.sequence_id,
                        expected: expected.to_string(),
                        actual: event.previous_checksum.clone(),
                    });
                }
            }
            previous = Some(event);
        }
        Ok(())
    }

    /// BLAKE3 over the session id and every retained checksum.
    pub fn session_checksum(&self) -> String {
        let state = lock(&self.state);
        let mut hasher = blake3::Hasher::new();
        hasher.update(state.session_id.as_deref().unwrap_or_default().as_bytes());
        for event in &state.events {
            hasher.update(event.checksum.as_bytes());
        }
        hex::encode(hasher.finalize().as_bytes())
    }

    /// Session summary and every retained event.
    pub fn export_json(&self) -> serde_json::Value {
        let session_checksum = self.session_checksum();
        let state = lock(&self.state);
        serde_json::json!({
            "session_id": state.session_id,
            "event_count": state.events.len(),
            "warning_count": state.warning_count,
            "error_count": state.error_count,
            "session_checksum": session_checksum,
            "events": state.events,
        })
    }

    #[cfg(test)]
    fn tamper<F: FnOnce(&mut Event)>(&self, index: usize, f: F) {
        if let Some(event) = lock(&self.state).events.get_mut(index) {
            f(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmicore_core::ManualClock;
    use std::sync::Arc;

    fn log() -> (Arc<ManualClock>, HmiEventLog) {
        let clock = Arc::new(ManualClock::new());
        let log = HmiEventLog::new(clock.clone());
        (clock, log)
    }

    #[test]
    fn test_events_are_chained() {
        let (clock, log) = log();
        log.log_state_change(AdasHmiState::Off, AdasHmiState::Available, "engagement");
        clock.advance_ms(20);
        log.log_engagement(true, AutomationLevel::L2);

        let events = log.recent_events(10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence_id, 0);
        assert_eq!(events[0].previous_checksum, "");
        assert_eq!(events[0].summary, "Off -> Available");
        assert_eq!(events[1].previous_checksum, events[0].checksum);
        assert_eq!(events[1].timestamp_ms, 20);
        assert_eq!(events[0].checksum.len(), 64);
        assert!(log.verify_integrity().is_ok());
    }

    #[test]
    fn test_tampering_detected() {
        let (_, log) = log();
        log.log_user_action("acknowledge", "driver pressed button");
        log.log_fault("camera", "lost frames", EventSeverity::Error);
        log.log_user_action("dismiss", "");

        log.tamper(1, |e| e.summary = "nothing happened".to_string());
        assert_eq!(
            log.verify_integrity(),
            Err(EventLogError::ChecksumMismatch { sequence_id: 1 })
        );
    }

    #[test]
    fn test_broken_link_detected() {
        let (_, log) = log();
        log.log_user_action("a", "");
        log.log_user_action("b", "");

        log.tamper(1, |e| {
            e.previous_checksum = "00".repeat(32);
            e.checksum = compute_checksum(e);
        });
        assert!(matches!(
            log.verify_integrity(),
            Err(EventLogError::ChainBroken { sequence_id: 1, .. })
        ));
    }

    #[test]
    fn test_bounded_and_still_verifiable() {
        let clock = Arc::new(ManualClock::new());
        let log = HmiEventLog::with_capacity(clock, 3);
        for i in 0..5 {
            log.log_user_action(&format!("action {}", i), "");
        }
        assert_eq!(log.event_count(), 3);
        assert_eq!(log.recent_events(1)[0].sequence_id, 4);
        assert_eq!(log.recent_events(10)[0].sequence_id, 2);
        assert!(log.verify_integrity().is_ok());
    }

    #[test]
    fn test_severity_counters() {
        let (_, log) = log();
        log.log_takeover_request(TakeoverUrgency::Warning, "ODD exit");
        log.log_takeover_request(TakeoverUrgency::Immediate, "Sensor failure");
        log.log_mrm_event("timeout");
        log.log_security_event(event_types::INTEGRITY_FAILURE, "sequence regression");
        log.log_fault("radar", "blocked", EventSeverity::Error);

        assert_eq!(log.warning_count(), 2);
        assert_eq!(log.error_count(), 3);
        assert_eq!(log.events_by_category(EventCategory::Takeover).len(), 3);
        assert_eq!(
            log.recent_events(5)[1].severity,
            EventSeverity::Critical
        );
    }

    #[test]
    fn test_context_and_range_queries() {
        let (clock, log) = log();
        log.set_current_state(AdasHmiState::EngagedL2, AutomationLevel::L2);
        log.log_user_action("first", "");
        clock.advance_ms(100);
        log.log_odd_event(OddStatus::Outside, "geofence");
        clock.advance_ms(100);
        log.log_perception_degraded("Lane detection stale");

        let first = &log.recent_events(3)[0];
        assert_eq!(first.context.hmi_state, "Engaged (L2)");
        assert_eq!(first.context.automation_level, "Partial Automation");
        assert_eq!(log.events_in_range(50, 150).len(), 1);
        assert_eq!(log.events_in_range(0, 200).len(), 3);
    }

    #[test]
    fn test_session_checksum_and_export() {
        let (_, log) = log();
        log.start_session("drive-42");
        log.log_takeover_response(true);
        let before = log.session_checksum();
        assert_eq!(before, log.session_checksum());

        log.end_session();
        assert_ne!(before, log.session_checksum());

        let export = log.export_json();
        assert_eq!(export["session_id"], "drive-42");
        assert_eq!(export["event_count"], 3);
        assert_eq!(export["events"][1]["event_type"], event_types::TAKEOVER_COMPLETED);
        assert_eq!(export["session_checksum"], log.session_checksum());
    }
}
