//! HMI state transition rules and sequence anti-replay.
//!
//! The adjacency table is a fixed bitmask per source state, so a lookup is a
//! single shift and mask.

use crate::engagement::AdasEngagement;
use crate::types::{AdasHmiState, AutomationLevel};

use AdasHmiState::*;

const fn mask(targets: &[AdasHmiState]) -> u16 {
    let mut bits = 0u16;
    let mut i = 0;
    while i < targets.len() {
        bits |= 1 << (targets[i] as u16);
        i += 1;
    }
    bits
}

/// Allowed targets, indexed by source state.
static TRANSITIONS: [u16; AdasHmiState::COUNT] = [
    // Off
    mask(&[Available, Degraded, FaultLockout]),
    // Available
    mask(&[Off, EngagedL1, EngagedL2, AvailableL3, Degraded, FaultLockout]),
    // EngagedL1
    mask(&[Off, Available, EngagedL1, EngagedL2, Degraded, FaultLockout]),
    // EngagedL2
    mask(&[Off, Available, EngagedL1, EngagedL2, Degraded, FaultLockout]),
    // AvailableL3
    mask(&[Off, Available, EngagedL3, Degraded, FaultLockout]),
    // EngagedL3
    mask(&[
        Off,
        AvailableL3,
        TakeoverRequested,
        Degraded,
        MrmActive,
        FaultLockout,
    ]),
    // TakeoverRequested
    mask(&[Off, Available, EngagedL3, MrmActive, FaultLockout]),
    // MrmActive
    mask(&[Off, Available, FaultLockout]),
    // Degraded
    mask(&[Off, Available, FaultLockout]),
    // FaultLockout: exit only through Off
    mask(&[Off]),
];

/// Whether `from -> to` is in the adjacency table.
pub fn is_transition_allowed(from: AdasHmiState, to: AdasHmiState) -> bool {
    TRANSITIONS[from as usize] & (1 << (to as u16)) != 0
}

/// Target HMI state for an engagement record.
pub fn derive_hmi_state(engagement: &AdasEngagement) -> AdasHmiState {
    if !engagement.metadata.is_valid() || !engagement.available {
        return Off;
    }

    if engagement.engaged {
        return match engagement.level {
            AutomationLevel::L0 => Off,
            AutomationLevel::L1 => EngagedL1,
            AutomationLevel::L2 => EngagedL2,
            // L4/L5 share the L3 presentation
            AutomationLevel::L3 | AutomationLevel::L4 | AutomationLevel::L5 => EngagedL3,
        };
    }

    if engagement.level >= AutomationLevel::L3 {
        AvailableL3
    } else {
        Available
    }
}

const WRAP_HIGH_WATER: u32 = 0x8000_0000;
const WRAP_LOW_WATER: u32 = 1000;

/// Anti-replay check for a record sequence number.
///
/// The first record is always accepted. After that the sequence must
/// strictly increase, except that a counter wrapping from the upper half of
/// the range back below 1000 is accepted.
pub fn sequence_accepted(last: Option<u32>, seq: u32) -> bool {
    match last {
        None => true,
        Some(last) if seq > last => true,
        Some(last) => last > WRAP_HIGH_WATER && seq < WRAP_LOW_WATER,
    }
}

/// Anti-replay check for ODD and driver monitoring records.
///
/// Stricter than the engagement rule: no wrap allowance, and a last-seen
/// value of 0 means nothing has been accepted yet.
pub fn record_sequence_accepted(last: u32, seq: u32) -> bool {
    last == 0 || seq > last
}
