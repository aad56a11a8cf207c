//! ADAS engagement, ODD, driver monitoring and takeover records.
//!
//! These are the inbound data contracts. Every record carries
//! [`SignalMetadata`] and deserializes with defaults for omitted fields.

use crate::types::{
    AdasHmiState, AttentionState, AutomationLevel, HandsOnState, OddStatus, SignalMetadata,
    TakeoverUrgency, WeatherCondition,
};
use serde::{Deserialize, Serialize};

/// Engagement and availability of the automation stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdasEngagement {
    pub metadata: SignalMetadata,
    pub level: AutomationLevel,
    /// State reported by the producer; the HMI derives its own
    pub hmi_state: AdasHmiState,
    pub available: bool,
    pub engaged: bool,
    pub set_speed_kph: f64,
    pub following_gap_seconds: f64,
    pub acc_active: bool,
    pub lka_active: bool,
    pub lca_active: bool,
    pub bsm_active: bool,
    pub aeb_armed: bool,
    pub max_speed_kph: f64,
    pub min_speed_kph: f64,
    pub min_following_gap: f64,
    pub max_following_gap: f64,
    /// Limitation messages for display
    pub limitations: Vec<String>,
}

impl Default for AdasEngagement {
    fn default() -> Self {
        Self {
            metadata: SignalMetadata::default(),
            level: AutomationLevel::L0,
            hmi_state: AdasHmiState::Off,
            available: false,
            engaged: false,
            set_speed_kph: 0.0,
            following_gap_seconds: 2.0,
            acc_active: false,
            lka_active: false,
            lca_active: false,
            bsm_active: false,
            aeb_armed: false,
            max_speed_kph: 200.0,
            min_speed_kph: 30.0,
            min_following_gap: 0.8,
            max_following_gap: 3.5,
            limitations: Vec::new(),
        }
    }
}

impl AdasEngagement {
    /// Engaged may only be shown when engaged, available and valid all hold.
    pub fn can_show_engaged(&self) -> bool {
        self.engaged && self.available && self.metadata.is_valid()
    }

    pub fn active_feature_count(&self) -> usize {
        [self.acc_active, self.lka_active, self.lca_active, self.bsm_active]
            .iter()
            .filter(|active| **active)
            .count()
    }

    /// Active features joined with " + ", e.g. "ACC + LKA".
    pub fn feature_summary(&self) -> String {
        let features = [
            (self.acc_active, "ACC"),
            (self.lka_active, "LKA"),
            (self.lca_active, "LCA"),
            (self.bsm_active, "BSM"),
        ];
        features
            .iter()
            .filter(|(active, _)| *active)
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// Operational design domain status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OddData {
    pub metadata: SignalMetadata,
    pub status: OddStatus,
    /// "highway", "urban" or "rural"
    pub road_type: String,
    pub max_speed_kph: f64,
    pub min_speed_kph: f64,
    pub weather_limit: WeatherCondition,
    pub geo_fence_active: bool,
    /// Negative when unknown
    pub distance_to_boundary_m: f64,
    /// Negative when unknown
    pub time_to_boundary_sec: f64,
    pub odd_reasons: Vec<String>,
}

impl Default for OddData {
    fn default() -> Self {
        Self {
            metadata: SignalMetadata::default(),
            status: OddStatus::Unknown,
            road_type: String::new(),
            max_speed_kph: 0.0,
            min_speed_kph: 0.0,
            weather_limit: WeatherCondition::Clear,
            geo_fence_active: false,
            distance_to_boundary_m: -1.0,
            time_to_boundary_sec: -1.0,
            odd_reasons: Vec::new(),
        }
    }
}

impl OddData {
    pub fn is_approaching_boundary(&self, threshold_sec: f64) -> bool {
        self.time_to_boundary_sec > 0.0 && self.time_to_boundary_sec <= threshold_sec
    }
}

/// Takeover request from the automation stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeoverRequest {
    pub metadata: SignalMetadata,
    pub active: bool,
    pub urgency: TakeoverUrgency,
    /// Seconds the driver has to respond
    pub countdown_sec: f64,
    pub required_action: String,
    pub reason: String,
    pub escalation_level: u32,
    pub audio_active: bool,
    pub haptic_active: bool,
}

impl TakeoverRequest {
    pub fn requires_immediate_action(&self) -> bool {
        self.active && (self.urgency >= TakeoverUrgency::Immediate || self.countdown_sec <= 5.0)
    }
}

/// Driver monitoring summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsStatus {
    pub metadata: SignalMetadata,
    pub hands_on_state: HandsOnState,
    pub attention_state: AttentionState,
    pub distraction_detected: bool,
    pub eyes_on_road: bool,
    pub gaze_duration_off_road_sec: f64,
    pub hands_on_reminder_active: bool,
    pub attention_reminder_active: bool,
    pub reminder_count: u32,
}

impl Default for DmsStatus {
    fn default() -> Self {
        Self {
            metadata: SignalMetadata::default(),
            hands_on_state: HandsOnState::Unknown,
            attention_state: AttentionState::Unknown,
            distraction_detected: false,
            eyes_on_road: true,
            gaze_duration_off_road_sec: 0.0,
            hands_on_reminder_active: false,
            attention_reminder_active: false,
            reminder_count: 0,
        }
    }
}

impl DmsStatus {
    pub fn is_attentive(&self) -> bool {
        self.attention_state == AttentionState::Attentive
            && !self.distraction_detected
            && self.eyes_on_road
    }

    pub fn needs_hands_on_reminder(&self) -> bool {
        self.hands_on_state == HandsOnState::HandsOff && self.hands_on_reminder_active
    }
}
