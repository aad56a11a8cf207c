//! Perception data model for ADAS visualization.
//!
//! Holds the latest lane model, lead vehicle, object list and drivable
//! corridor. Each record is timestamped on arrival and invalidated once it
//! ages past the perception freshness window; stale objects are removed so
//! no outdated markers are drawn.

use crate::types::{ConfidenceLevel, LaneType, ObjectType, SignalMetadata};
use hmicore_core::notify::lock;
use hmicore_core::{Notifier, SharedClock};
use hmicore_sched::TickInfo;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Default perception freshness window (ms)
pub const PERCEPTION_FRESHNESS_MS: u64 = 200;

/// Point in the vehicle frame: x forward, y left (m).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneBoundary {
    pub lane_type: LaneType,
    pub confidence: ConfidenceLevel,
    pub points: Vec<Point2D>,
    /// 0.0 to 1.0
    pub quality_score: f64,
    pub is_valid: bool,
}

impl LaneBoundary {
    pub fn color_hint(&self) -> &'static str {
        match self.confidence {
            ConfidenceLevel::High => "green",
            ConfidenceLevel::Medium => "yellow",
            ConfidenceLevel::Low => "red",
            ConfidenceLevel::NotAvailable => "gray",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneModel {
    pub metadata: SignalMetadata,
    pub left: LaneBoundary,
    pub right: LaneBoundary,
    pub lane_width_m: f64,
    /// 0 for a straight lane
    pub curvature_rad_m: f64,
    pub heading_offset_deg: f64,
    /// Offset from lane center, positive left
    pub lateral_offset_m: f64,
    pub is_centered: bool,
}

impl Default for LaneModel {
    fn default() -> Self {
        Self {
            metadata: SignalMetadata::default(),
            left: LaneBoundary::default(),
            right: LaneBoundary::default(),
            lane_width_m: 3.5,
            curvature_rad_m: 0.0,
            heading_offset_deg: 0.0,
            lateral_offset_m: 0.0,
            is_centered: true,
        }
    }
}

impl LaneModel {
    /// Lower of the two boundary confidences, or `NotAvailable` if either is invalid.
    pub fn overall_quality(&self) -> ConfidenceLevel {
        if !self.left.is_valid || !self.right.is_valid {
            return ConfidenceLevel::NotAvailable;
        }
        self.left.confidence.min(self.right.confidence)
    }

    pub fn has_valid_lanes(&self) -> bool {
        self.left.is_valid || self.right.is_valid
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceivedObject {
    /// Tracking id
    pub id: u32,
    pub object_type: ObjectType,
    pub confidence: ConfidenceLevel,
    pub position: Position3D,
    pub heading_deg: f64,
    pub speed_mps: f64,
    pub relative_speed_mps: f64,
    pub length_m: f64,
    pub width_m: f64,
    pub height_m: f64,
    /// In the ego lane or adjacent
    pub is_relevant: bool,
    pub is_threat: bool,
}

impl PerceivedObject {
    /// Planar distance from the ego origin.
    pub fn distance(&self) -> f64 {
        self.position.x.hypot(self.position.y)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadVehicle {
    pub metadata: SignalMetadata,
    pub id: u32,
    pub detected: bool,
    pub confidence: ConfidenceLevel,
    pub distance_m: f64,
    pub lateral_offset_m: f64,
    /// Negative when closing
    pub relative_speed_mps: f64,
    pub absolute_speed_mps: f64,
    pub time_gap_sec: f64,
    /// Negative when diverging
    pub ttc_sec: f64,
}

impl LeadVehicle {
    pub fn is_closing(&self) -> bool {
        self.relative_speed_mps < -0.5
    }

    pub fn is_diverging(&self) -> bool {
        self.relative_speed_mps > 0.5
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectList {
    pub metadata: SignalMetadata,
    pub objects: Vec<PerceivedObject>,
}

impl ObjectList {
    pub fn vehicle_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| {
                matches!(
                    o.object_type,
                    ObjectType::Car | ObjectType::Truck | ObjectType::Motorcycle
                )
            })
            .count()
    }

    pub fn pedestrian_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| o.object_type == ObjectType::Pedestrian)
            .count()
    }

    pub fn relevant_objects(&self) -> Vec<PerceivedObject> {
        self.objects.iter().filter(|o| o.is_relevant).cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivableCorridor {
    pub metadata: SignalMetadata,
    pub centerline: Vec<Point2D>,
    pub left_boundary: Vec<Point2D>,
    pub right_boundary: Vec<Point2D>,
    pub width_m: f64,
    pub path_length_m: f64,
    pub max_curvature: f64,
    pub is_valid: bool,
}

impl Default for DrivableCorridor {
    fn default() -> Self {
        Self {
            metadata: SignalMetadata::default(),
            centerline: Vec::new(),
            left_boundary: Vec::new(),
            right_boundary: Vec::new(),
            width_m: 2.0,
            path_length_m: 100.0,
            max_curvature: 0.0,
            is_valid: false,
        }
    }
}

/// Notifications raised by the perception model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerceptionEvent {
    LaneModelChanged,
    LeadVehicleChanged,
    ObjectsChanged,
    CorridorChanged,
    PerceptionDegraded(String),
}

#[derive(Debug, Default)]
struct PerceptionState {
    lanes: LaneModel,
    lead: LeadVehicle,
    objects: ObjectList,
    corridor: DrivableCorridor,
    lanes_at_ms: Option<u64>,
    lead_at_ms: Option<u64>,
    objects_at_ms: Option<u64>,
    corridor_at_ms: Option<u64>,
}

/// Latest perception records with independent freshness.
pub struct PerceptionModel {
    clock: SharedClock,
    freshness_window_ms: u64,
    state: Mutex<PerceptionState>,
    events: Notifier<PerceptionEvent>,
}

impl PerceptionModel {
    pub fn new(clock: SharedClock) -> Self {
        Self::with_freshness_window(clock, PERCEPTION_FRESHNESS_MS)
    }

    pub fn with_freshness_window(clock: SharedClock, freshness_window_ms: u64) -> Self {
        Self {
            clock,
            freshness_window_ms,
            state: Mutex::new(PerceptionState::default()),
            events: Notifier::new(),
        }
    }

    pub fn events(&self) -> &Notifier<PerceptionEvent> {
        &self.events
    }

    pub fn update_lane_model(&self, lanes: LaneModel) {
        let now = self.clock.elapsed_ms();
        {
            let mut state = lock(&self.state);
            state.lanes = lanes;
            state.lanes_at_ms = Some(now);
        }
        self.events.emit(&PerceptionEvent::LaneModelChanged);
    }

    pub fn update_lead_vehicle(&self, lead: LeadVehicle) {
        let now = self.clock.elapsed_ms();
        {
            let mut state = lock(&self.state);
            state.lead = lead;
            state.lead_at_ms = Some(now);
        }
        self.events.emit(&PerceptionEvent::LeadVehicleChanged);
    }

    pub fn update_object_list(&self, objects: ObjectList) {
        let now = self.clock.elapsed_ms();
        {
            let mut state = lock(&self.state);
            debug!(count = objects.objects.len(), "object list updated");
            state.objects = objects;
            state.objects_at_ms = Some(now);
        }
        self.events.emit(&PerceptionEvent::ObjectsChanged);
    }

    pub fn update_corridor(&self, corridor: DrivableCorridor) {
        let now = self.clock.elapsed_ms();
        {
            let mut state = lock(&self.state);
            state.corridor = corridor;
            state.corridor_at_ms = Some(now);
        }
        self.events.emit(&PerceptionEvent::CorridorChanged);
    }

    /// Invalidate every record older than the freshness window.
    ///
    /// A record is invalidated once; it stays invalid until replaced.
    pub fn process_tick(&self, _tick: TickInfo) {
        let now = self.clock.elapsed_ms();
        let window = self.freshness_window_ms;
        let is_stale = |at: Option<u64>| at.is_some_and(|at| now.saturating_sub(at) > window);
        let mut pending = Vec::new();

        {
            let mut state = lock(&self.state);

            if is_stale(state.lanes_at_ms) && state.lanes.metadata.valid {
                state.lanes.metadata.valid = false;
                pending.push(degraded("Lane detection stale"));
                pending.push(PerceptionEvent::LaneModelChanged);
            }

            if is_stale(state.lead_at_ms) && state.lead.metadata.valid {
                state.lead.metadata.valid = false;
                state.lead.detected = false;
                pending.push(degraded("Lead vehicle stale"));
                pending.push(PerceptionEvent::LeadVehicleChanged);
            }

            // Objects are cleared on age whatever the flag says
            let objects_live =
                state.objects.metadata.valid || !state.objects.objects.is_empty();
            if is_stale(state.objects_at_ms) && objects_live {
                state.objects.metadata.valid = false;
                state.objects.objects.clear();
                pending.push(degraded("Object list stale"));
                pending.push(PerceptionEvent::ObjectsChanged);
            }

            if is_stale(state.corridor_at_ms) && state.corridor.metadata.valid {
                state.corridor.metadata.valid = false;
                state.corridor.is_valid = false;
                pending.push(degraded("Drivable corridor stale"));
                pending.push(PerceptionEvent::CorridorChanged);
            }
        }

        self.events.emit_all(pending);
    }

    pub fn has_valid_lanes(&self) -> bool {
        let state = lock(&self.state);
        state.lanes.has_valid_lanes() && state.lanes.metadata.is_valid()
    }

    pub fn lane_quality(&self) -> ConfidenceLevel {
        lock(&self.state).lanes.overall_quality()
    }

    pub fn lateral_offset(&self) -> f64 {
        lock(&self.state).lanes.lateral_offset_m
    }

    pub fn lane_model(&self) -> LaneModel {
        lock(&self.state).lanes.clone()
    }

    pub fn has_lead_vehicle(&self) -> bool {
        let state = lock(&self.state);
        state.lead.detected && state.lead.metadata.is_valid()
    }

    pub fn lead_distance(&self) -> f64 {
        lock(&self.state).lead.distance_m
    }

    pub fn lead_relative_speed(&self) -> f64 {
        lock(&self.state).lead.relative_speed_mps
    }

    pub fn time_gap(&self) -> f64 {
        lock(&self.state).lead.time_gap_sec
    }

    pub fn lead_vehicle(&self) -> LeadVehicle {
        lock(&self.state).lead.clone()
    }

    pub fn object_count(&self) -> usize {
        lock(&self.state).objects.objects.len()
    }

    pub fn object_list(&self) -> ObjectList {
        lock(&self.state).objects.clone()
    }

    pub fn relevant_objects(&self) -> Vec<PerceivedObject> {
        lock(&self.state).objects.relevant_objects()
    }

    pub fn has_valid_corridor(&self) -> bool {
        let state = lock(&self.state);
        state.corridor.is_valid && state.corridor.metadata.is_valid()
    }

    pub fn corridor(&self) -> DrivableCorridor {
        lock(&self.state).corridor.clone()
    }
}

fn degraded(reason: &str) -> PerceptionEvent {
    warn!(reason, "perception degraded");
    PerceptionEvent::PerceptionDegraded(reason.to_string())
}
