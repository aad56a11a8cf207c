//! Audit event schema for the HMI core.
//!
//! Provides standardized event types for state transitions, engagement
//! changes, takeover escalation, integrity failures and faults. Events are
//! stamped with a monotonic timestamp and the HMI state and automation level
//! active when they were recorded.

use serde::{Deserialize, Serialize};

/// Severity level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Diagnostic detail
    Debug,
    /// Informational event
    Info,
    /// Warning condition
    Warning,
    /// Error condition
    Error,
    /// Safety-critical event
    Critical,
}

/// Category of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// HMI state machine transitions
    StateChange,
    /// Automation engagement and disengagement
    Engagement,
    /// Takeover requests, escalation and minimal risk maneuvers
    Takeover,
    /// Perception data quality
    Perception,
    /// Operational design domain changes
    Odd,
    /// Driver monitoring
    DriverMonitoring,
    /// Component faults and degraded operation
    Fault,
    /// Integrity failures and blocked transitions
    Security,
    /// Driver-initiated actions
    UserAction,
    /// Session lifecycle and housekeeping
    System,
}

/// HMI context captured with each event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// HMI state display name
    pub hmi_state: String,
    /// Automation level display name
    pub automation_level: String,
}

/// Core audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Position in the log, assigned on append
    pub sequence_id: u64,
    /// Monotonic timestamp (ms), assigned on append
    pub timestamp_ms: u64,
    /// Event severity
    pub severity: EventSeverity,
    /// Event category
    pub category: EventCategory,
    /// Event type (specific action or state)
    pub event_type: String,
    /// One-line human-readable summary
    pub summary: String,
    /// Optional longer description
    pub details: String,
    /// Structured metadata
    pub data: EventMetadata,
    /// HMI context at the time of the event, assigned on append
    pub context: EventContext,
    /// Checksum of the preceding event in the log
    pub previous_checksum: String,
    /// Checksum over this event's content and `previous_checksum`
    pub checksum: String,
}

/// Structured metadata for events.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EventMetadata {
    /// Key-value pairs for additional context
    #[serde(flatten)]
    pub data: std::collections::BTreeMap<String, serde_json::Value>,
}

impl EventMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key-value pair.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Canonical JSON encoding (keys sorted).
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(&self.data).unwrap_or_default()
    }
}

/// Builder for creating events.
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    /// Create a new event builder.
    pub fn new(event_type: impl Into<String>, category: EventCategory) -> Self {
        Self {
            event: Event {
                sequence_id: 0,
                timestamp_ms: 0,
                severity: EventSeverity::Info,
                category,
                event_type: event_type.into(),
                summary: String::new(),
                details: String::new(),
                data: EventMetadata::new(),
                context: EventContext::default(),
                previous_checksum: String::new(),
                checksum: String::new(),
            },
        }
    }

    /// Set the severity.
    pub fn severity(mut self, severity: EventSeverity) -> Self {
        self.event.severity = severity;
        self
    }

    /// Set the summary.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.event.summary = summary.into();
        self
    }

    /// Set the details.
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.event.details = details.into();
        self
    }

    /// Add metadata.
    pub fn data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.event.data.insert(key, value);
        self
    }

    /// Build the event.
    pub fn build(self) -> Event {
        self.event
    }
}

/// Standard event types.
pub mod event_types {
    // State machine
    pub const STATE_CHANGE: &str = "state.change";
    pub const STATE_STALE: &str = "state.stale";
    pub const ENGAGEMENT_CHANGE: &str = "engagement.change";

    // Takeover pipeline
    pub const TAKEOVER_REQUEST: &str = "takeover.request";
    pub const TAKEOVER_ESCALATION: &str = "takeover.escalation";
    pub const TAKEOVER_COMPLETED: &str = "takeover.completed";
    pub const TAKEOVER_CANCELLED: &str = "takeover.cancelled";
    pub const MRM_STARTED: &str = "takeover.mrm_started";

    // Security events
    pub const INTEGRITY_FAILURE: &str = "security.integrity_failure";
    pub const TRANSITION_BLOCKED: &str = "security.transition_blocked";

    // Faults
    pub const FAULT: &str = "fault.reported";
    pub const SIGNAL_DEGRADED: &str = "fault.signal_degraded";
    pub const PERCEPTION_DEGRADED: &str = "perception.degraded";
    pub const ODD_CHANGE: &str = "odd.change";

    // Operator and lifecycle
    pub const USER_ACTION: &str = "user.action";
    pub const SESSION_STARTED: &str = "system.session_started";
    pub const SESSION_ENDED: &str = "system.session_ended";
}
