//! Inbound message envelope.
//!
//! One JSON object per message, discriminated by a `type` field:
//!
//! ```json
//! {"type":"signal","id":"vehicle.speed","value":88.5}
//! {"type":"engagement","metadata":{"sequence_number":7,"valid":true,"confidence":"High"},"level":"L2","available":true,"engaged":true}
//! {"type":"acknowledge_takeover"}
//! ```

use crate::error::RuntimeResult;
use hmicore_adas::{
    AdasEngagement, DmsStatus, DrivableCorridor, LaneModel, LeadVehicle, ObjectList, OddData,
    TakeoverRequest,
};
use hmicore_signal::SignalData;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Signal {
        id: String,
        value: SignalData,
        #[serde(default)]
        source_timestamp_ms: Option<u64>,
    },
    Engagement(AdasEngagement),
    Odd(OddData),
    Dms(DmsStatus),
    Takeover(TakeoverRequest),
    Lanes(LaneModel),
    Lead(LeadVehicle),
    Objects(ObjectList),
    Corridor(DrivableCorridor),
    /// Driver confirmed they have taken control
    AcknowledgeTakeover,
}

impl InboundMessage {
    pub fn from_json(line: &str) -> RuntimeResult<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Signal { .. } => "signal",
            Self::Engagement(_) => "engagement",
            Self::Odd(_) => "odd",
            Self::Dms(_) => "dms",
            Self::Takeover(_) => "takeover",
            Self::Lanes(_) => "lanes",
            Self::Lead(_) => "lead",
            Self::Objects(_) => "objects",
            Self::Corridor(_) => "corridor",
            Self::AcknowledgeTakeover => "acknowledge_takeover",
        }
    }
}
