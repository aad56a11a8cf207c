//! ADAS error types

use crate::types::AdasHmiState;
use thiserror::Error;

/// Rejections from the ADAS state service.
///
/// Every rejection is also published as a notification so observers that do
/// not inspect return values still see it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdasError {
    #[error("Sequence number regression detected: last {last}, received {received}")]
    SequenceRegression { last: u32, received: u32 },

    #[error("Transition not allowed: {from:?} -> {to:?}")]
    TransitionBlocked { from: AdasHmiState, to: AdasHmiState },
}

/// Result type for ADAS operations
pub type AdasResult<T> = Result<T, AdasError>;

/// Audit log integrity violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventLogError {
    #[error("Checksum mismatch at sequence {sequence_id}")]
    ChecksumMismatch { sequence_id: u64 },

    #[error("Chain broken at sequence {sequence_id}: expected previous {expected}, got {actual}")]
    ChainBroken {
        sequence_id: u64,
        expected: String,
        actual: String,
    },
}
