//! Shared ADAS enumerations and signal metadata.

use serde::{Deserialize, Serialize};

/// SAE J3016 automation level.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AutomationLevel {
    /// No driving automation
    #[default]
    L0,
    /// Steering or speed assistance
    L1,
    /// Steering and speed assistance, driver supervises
    L2,
    /// System drives inside its ODD, driver is the fallback
    L3,
    /// System drives and handles the fallback inside its ODD
    L4,
    /// System drives everywhere
    L5,
}

impl AutomationLevel {
    pub fn text(self) -> &'static str {
        match self {
            Self::L0 => "No Automation",
            Self::L1 => "Driver Assistance",
            Self::L2 => "Partial Automation",
            Self::L3 => "Conditional Automation",
            Self::L4 => "High Automation",
            Self::L5 => "Full Automation",
        }
    }
}

/// HMI presentation state.
///
/// Declaration order is the row order of the transition table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdasHmiState {
    #[default]
    Off,
    Available,
    EngagedL1,
    EngagedL2,
    AvailableL3,
    EngagedL3,
    TakeoverRequested,
    MrmActive,
    Degraded,
    FaultLockout,
}

impl AdasHmiState {
    /// Number of states.
    pub const COUNT: usize = 10;

    pub const ALL: [AdasHmiState; Self::COUNT] = [
        Self::Off,
        Self::Available,
        Self::EngagedL1,
        Self::EngagedL2,
        Self::AvailableL3,
        Self::EngagedL3,
        Self::TakeoverRequested,
        Self::MrmActive,
        Self::Degraded,
        Self::FaultLockout,
    ];

    /// Display text shown to the driver.
    pub fn text(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Available => "Available",
            Self::EngagedL1 => "Engaged (L1)",
            Self::EngagedL2 => "Engaged (L2)",
            Self::AvailableL3 => "Available (L3)",
            Self::EngagedL3 => "Engaged (L3)",
            Self::TakeoverRequested => "Takeover Requested",
            Self::MrmActive => "Safe Stop Active",
            Self::Degraded => "Limited",
            Self::FaultLockout => "Service Required",
        }
    }

    pub fn is_engaged_group(self) -> bool {
        matches!(self, Self::EngagedL1 | Self::EngagedL2 | Self::EngagedL3)
    }

    pub fn is_available_group(self) -> bool {
        matches!(self, Self::Available | Self::AvailableL3)
    }
}

impl std::fmt::Display for AdasHmiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// Takeover urgency, ordered from none to critical.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TakeoverUrgency {
    #[default]
    None,
    /// ODD ending soon
    Advisory,
    /// Take over within seconds
    Warning,
    /// Take over now
    Immediate,
    /// System will start a minimal risk maneuver without a response
    Critical,
}

/// Data confidence, ordered from none to high.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ConfidenceLevel {
    #[default]
    NotAvailable,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneType {
    #[default]
    Unknown,
    Solid,
    Dashed,
    DoubleSolid,
    DashedSolid,
    SolidDashed,
    RoadEdge,
    /// Computed or predicted boundary
    Virtual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    #[default]
    Unknown,
    Car,
    Truck,
    Motorcycle,
    Bicycle,
    Pedestrian,
    Animal,
    Cone,
    Barrier,
    Sign,
    TrafficLight,
}

/// Operational design domain status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OddStatus {
    #[default]
    Unknown,
    Inside,
    ApproachingBoundary,
    Outside,
    Degraded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttentionState {
    #[default]
    Unknown,
    Attentive,
    Distracted,
    Drowsy,
    Unresponsive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandsOnState {
    #[default]
    Unknown,
    HandsOn,
    HandsOff,
    SingleHand,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherCondition {
    #[default]
    Clear,
    Cloudy,
    LightRain,
    HeavyRain,
    LightSnow,
    HeavySnow,
    Fog,
    Mist,
    Ice,
}

/// Default freshness window for ADAS records (ms).
pub const ADAS_FRESHNESS_WINDOW_MS: u64 = 300;

/// Metadata carried by every ADAS record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalMetadata {
    /// Monotonic timestamp (ms)
    pub timestamp_ms: u64,
    /// Producer-supplied timestamp (ms)
    pub source_timestamp_ms: u64,
    pub sequence_number: u32,
    pub confidence: ConfidenceLevel,
    pub valid: bool,
}

impl SignalMetadata {
    /// Valid flag set and confidence at least Low.
    pub fn is_valid(&self) -> bool {
        self.valid && self.confidence >= ConfidenceLevel::Low
    }

    pub fn is_fresh(&self, now_ms: u64, window_ms: u64) -> bool {
        now_ms.saturating_sub(self.timestamp_ms) <= window_ms
    }
}

/// Who is responsible for driving at the given level.
pub fn responsibility_owner(level: AutomationLevel, engaged: bool) -> &'static str {
    if !engaged {
        return "Driver";
    }
    match level {
        AutomationLevel::L0 | AutomationLevel::L1 | AutomationLevel::L2 => {
            "Driver (System Assists)"
        }
        AutomationLevel::L3 => "System (Be Ready to Take Over)",
        AutomationLevel::L4 | AutomationLevel::L5 => "System",
    }
}
