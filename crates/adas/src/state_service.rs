//! Authoritative ADAS HMI state machine.
//!
//! The service owns the HMI state. Inbound engagement, ODD and driver
//! monitoring records pass an anti-replay check before they are stored; the
//! HMI state is then derived from the engagement record and applied only if
//! the transition table permits it. On every scheduler tick the engagement
//! record is aged, and a stale record drops the display to `Degraded` once
//! per staleness episode.

use crate::engagement::{AdasEngagement, DmsStatus, OddData};
use crate::error::{AdasError, AdasResult};
use crate::transitions::{
    derive_hmi_state, is_transition_allowed, record_sequence_accepted, sequence_accepted,
};
use crate::types::{
    responsibility_owner, AdasHmiState, AutomationLevel, ADAS_FRESHNESS_WINDOW_MS,
};
use hmicore_core::notify::lock;
use hmicore_core::{Notifier, SharedClock};
use hmicore_sched::TickInfo;
use std::sync::Mutex;
use tracing::{debug, info, warn};

const REASON_NOT_ALLOWED: &str = "Transition not allowed";
const REASON_INVALID_REQUEST: &str = "Invalid state transition";
const REASON_STALE: &str = "Stale engagement data";
const REASON_FORCED: &str = "Forced degraded mode";

/// Notifications raised by the state service.
#[derive(Debug, Clone, PartialEq)]
pub enum AdasEvent {
    HmiStateChanged {
        from: AdasHmiState,
        to: AdasHmiState,
    },
    StateTextChanged(String),
    /// Engaged predicate, raised when the state enters or leaves the engaged group
    EngagedChanged(bool),
    /// Available predicate, raised when the state enters or leaves the available group
    AvailableChanged(bool),
    DegradedChanged(bool),
    EngagementUpdated(AdasEngagement),
    OddStatusUpdated(OddData),
    DmsStatusUpdated(DmsStatus),
    StaleStateDetected,
    IntegrityFailure(String),
    StateTransitionBlocked {
        from: AdasHmiState,
        to: AdasHmiState,
        reason: String,
    },
}

#[derive(Debug, Default)]
struct ServiceState {
    hmi_state: AdasHmiState,
    engagement: AdasEngagement,
    odd: OddData,
    dms: DmsStatus,
    last_engagement_update_ms: Option<u64>,
    last_engagement_seq: Option<u32>,
    last_odd_seq: u32,
    last_dms_seq: u32,
    stale_reported: bool,
    forced_degraded: bool,
    last_state_change_ms: u64,
}

impl ServiceState {
    fn is_engaged(&self) -> bool {
        self.engagement.can_show_engaged()
    }

    fn is_available(&self) -> bool {
        self.engagement.available && self.engagement.metadata.is_valid()
    }

    fn is_degraded(&self) -> bool {
        self.hmi_state == AdasHmiState::Degraded || self.forced_degraded
    }

    /// Apply a table-checked transition, queueing its notifications.
    fn transition(
        &mut self,
        to: AdasHmiState,
        now_ms: u64,
        reason: &str,
        pending: &mut Vec<AdasEvent>,
    ) -> AdasResult<()> {
        let from = self.hmi_state;
        if !is_transition_allowed(from, to) {
            warn!(?from, ?to, reason, "state transition blocked");
            pending.push(AdasEvent::StateTransitionBlocked {
                from,
                to,
                reason: reason.to_string(),
            });
            return Err(AdasError::TransitionBlocked { from, to });
        }
        if from == to {
            return Ok(());
        }

        info!(?from, ?to, "hmi state changed");
        self.hmi_state = to;
        self.last_state_change_ms = now_ms;
        pending.push(AdasEvent::HmiStateChanged { from, to });
        pending.push(AdasEvent::StateTextChanged(to.text().to_string()));

        if from.is_engaged_group() != to.is_engaged_group() {
            pending.push(AdasEvent::EngagedChanged(self.is_engaged()));
        }
        if from.is_available_group() != to.is_available_group() {
            pending.push(AdasEvent::AvailableChanged(self.is_available()));
        }
        Ok(())
    }
}

/// An L3 record that is still engaged does not pull the display out of a
/// takeover or MRM; those states are left by explicit requests.
fn holds_takeover(current: AdasHmiState, target: AdasHmiState) -> bool {
    target == AdasHmiState::EngagedL3
        && matches!(
            current,
            AdasHmiState::TakeoverRequested | AdasHmiState::MrmActive
        )
}

fn push_degraded_change(state: &ServiceState, was_degraded: bool, pending: &mut Vec<AdasEvent>) {
    let degraded = state.is_degraded();
    if degraded != was_degraded {
        pending.push(AdasEvent::DegradedChanged(degraded));
    }
}

/// Authoritative source of HMI state.
pub struct AdasStateService {
    clock: SharedClock,
    freshness_window_ms: u64,
    state: Mutex<ServiceState>,
    events: Notifier<AdasEvent>,
}

impl AdasStateService {
    /// Create a service with the default 300 ms freshness window.
    pub fn new(clock: SharedClock) -> Self {
        Self::with_freshness_window(clock, ADAS_FRESHNESS_WINDOW_MS)
    }

    pub fn with_freshness_window(clock: SharedClock, freshness_window_ms: u64) -> Self {
        let now = clock.elapsed_ms();
        Self {
            clock,
            freshness_window_ms,
            state: Mutex::new(ServiceState {
                last_state_change_ms: now,
                ..Default::default()
            }),
            events: Notifier::new(),
        }
    }

    pub fn events(&self) -> &Notifier<AdasEvent> {
        &self.events
    }

    /// Accept an engagement record and re-derive the HMI state.
    ///
    /// A sequence regression is rejected with state unchanged. An accepted
    /// record whose derived state is not reachable from the current state is
    /// still stored; the transition alone is blocked and reported.
    pub fn update_engagement(&self, engagement: AdasEngagement) -> AdasResult<()> {
        let now = self.clock.elapsed_ms();
        let seq = engagement.metadata.sequence_number;
        let mut pending = Vec::new();

        let result = {
            let mut state = lock(&self.state);
            if !sequence_accepted(state.last_engagement_seq, seq) {
                let last = state.last_engagement_seq.unwrap_or_default();
                warn!(last, received = seq, "engagement sequence regression");
                pending.push(AdasEvent::IntegrityFailure(
                    "Sequence number regression detected".to_string(),
                ));
                Err(AdasError::SequenceRegression {
                    last,
                    received: seq,
                })
            } else {
                let was_degraded = state.is_degraded();
                state.engagement = engagement.clone();
                state.last_engagement_update_ms = Some(now);
                state.last_engagement_seq = Some(seq);
                state.stale_reported = false;
                pending.push(AdasEvent::EngagementUpdated(engagement));

                let target = if state.forced_degraded {
                    AdasHmiState::Degraded
                } else {
                    derive_hmi_state(&state.engagement)
                };
                if target != state.hmi_state && !holds_takeover(state.hmi_state, target) {
                    // Blocked transitions are reported, the record stays accepted
                    let _ = state.transition(target, now, REASON_NOT_ALLOWED, &mut pending);
                }
                push_degraded_change(&state, was_degraded, &mut pending);
                debug!(seq, state = ?state.hmi_state, "engagement accepted");
                Ok(())
            }
        };

        self.events.emit_all(pending);
        result
    }

    /// Accept an ODD status record after the anti-replay check.
    pub fn update_odd_status(&self, odd: OddData) -> AdasResult<()> {
        let seq = odd.metadata.sequence_number;
        let result = {
            let mut state = lock(&self.state);
            if record_sequence_accepted(state.last_odd_seq, seq) {
                state.odd = odd.clone();
                state.last_odd_seq = seq;
                Ok(())
            } else {
                Err(AdasError::SequenceRegression {
                    last: state.last_odd_seq,
                    received: seq,
                })
            }
        };
        self.finish_record_update(result, AdasEvent::OddStatusUpdated(odd), "odd")
    }

    /// Accept a driver monitoring record after the anti-replay check.
    pub fn update_dms_status(&self, dms: DmsStatus) -> AdasResult<()> {
        let seq = dms.metadata.sequence_number;
        let result = {
            let mut state = lock(&self.state);
            if record_sequence_accepted(state.last_dms_seq, seq) {
                state.dms = dms.clone();
                state.last_dms_seq = seq;
                Ok(())
            } else {
                Err(AdasError::SequenceRegression {
                    last: state.last_dms_seq,
                    received: seq,
                })
            }
        };
        self.finish_record_update(result, AdasEvent::DmsStatusUpdated(dms), "dms")
    }

    fn finish_record_update(
        &self,
        result: AdasResult<()>,
        accepted: AdasEvent,
        record: &str,
    ) -> AdasResult<()> {
        match &result {
            Ok(()) => self.events.emit(&accepted),
            Err(err) => {
                warn!(record, %err, "record rejected");
                self.events.emit(&AdasEvent::IntegrityFailure(
                    "Sequence number regression detected".to_string(),
                ));
            }
        }
        result
    }

    /// Age the engagement record.
    ///
    /// The first tick past the freshness window invalidates the record and
    /// moves to `Degraded`, unless the state is `Off` or `FaultLockout`. The
    /// latch is cleared by the next accepted engagement.
    pub fn process_tick(&self, tick: TickInfo) {
        let now = self.clock.elapsed_ms();
        let mut pending = Vec::new();
        {
            let mut state = lock(&self.state);
            let Some(last_update) = state.last_engagement_update_ms else {
                return;
            };
            let age = now.saturating_sub(last_update);
            if age <= self.freshness_window_ms || state.stale_reported {
                return;
            }

            state.stale_reported = true;
            if matches!(
                state.hmi_state,
                AdasHmiState::Off | AdasHmiState::FaultLockout
            ) {
                return;
            }

            warn!(age_ms = age, tick = tick.tick_number, "engagement data stale");
            let was_degraded = state.is_degraded();
            state.engagement.metadata.valid = false;
            pending.push(AdasEvent::StaleStateDetected);
            let _ = state.transition(AdasHmiState::Degraded, now, REASON_STALE, &mut pending);
            push_degraded_change(&state, was_degraded, &mut pending);
        }
        self.events.emit_all(pending);
    }

    /// Request an explicit transition, checked against the table.
    pub fn request_state_transition(&self, to: AdasHmiState) -> AdasResult<()> {
        let now = self.clock.elapsed_ms();
        let mut pending = Vec::new();
        let result = {
            let mut state = lock(&self.state);
            let was_degraded = state.is_degraded();
            let result = state.transition(to, now, REASON_INVALID_REQUEST, &mut pending);
            push_degraded_change(&state, was_degraded, &mut pending);
            result
        };
        self.events.emit_all(pending);
        result
    }

    /// Hold the display in `Degraded` regardless of the engagement record.
    ///
    /// Clearing the flag re-derives the state from the stored record.
    pub fn force_degraded_mode(&self, degraded: bool) {
        let now = self.clock.elapsed_ms();
        let mut pending = Vec::new();
        {
            let mut state = lock(&self.state);
            if state.forced_degraded == degraded {
                return;
            }
            info!(degraded, "forced degraded mode changed");
            let was_degraded = state.is_degraded();
            state.forced_degraded = degraded;

            let target = if degraded {
                AdasHmiState::Degraded
            } else {
                derive_hmi_state(&state.engagement)
            };
            if target != state.hmi_state {
                let _ = state.transition(target, now, REASON_FORCED, &mut pending);
            }
            push_degraded_change(&state, was_degraded, &mut pending);
        }
        self.events.emit_all(pending);
    }

    pub fn hmi_state(&self) -> AdasHmiState {
        lock(&self.state).hmi_state
    }

    pub fn automation_level(&self) -> AutomationLevel {
        lock(&self.state).engagement.level
    }

    /// True only when the record is engaged, available and valid.
    pub fn is_engaged(&self) -> bool {
        lock(&self.state).is_engaged()
    }

    pub fn is_available(&self) -> bool {
        lock(&self.state).is_available()
    }

    pub fn is_degraded(&self) -> bool {
        lock(&self.state).is_degraded()
    }

    pub fn state_text(&self) -> &'static str {
        lock(&self.state).hmi_state.text()
    }

    pub fn level_text(&self) -> &'static str {
        lock(&self.state).engagement.level.text()
    }

    pub fn responsibility_text(&self) -> &'static str {
        let state = lock(&self.state);
        responsibility_owner(state.engagement.level, state.engagement.engaged)
    }

    pub fn set_speed(&self) -> f64 {
        lock(&self.state).engagement.set_speed_kph
    }

    pub fn following_gap(&self) -> f64 {
        lock(&self.state).engagement.following_gap_seconds
    }

    pub fn feature_summary(&self) -> String {
        lock(&self.state).engagement.feature_summary()
    }

    pub fn is_acc_active(&self) -> bool {
        let state = lock(&self.state);
        state.engagement.acc_active && state.is_engaged()
    }

    pub fn is_lka_active(&self) -> bool {
        let state = lock(&self.state);
        state.engagement.lka_active && state.is_engaged()
    }

    pub fn is_lca_active(&self) -> bool {
        let state = lock(&self.state);
        state.engagement.lca_active && state.is_engaged()
    }

    /// Blind spot monitoring runs independently of engagement.
    pub fn is_bsm_active(&self) -> bool {
        lock(&self.state).engagement.bsm_active
    }

    pub fn engagement(&self) -> AdasEngagement {
        lock(&self.state).engagement.clone()
    }

    pub fn odd_status(&self) -> OddData {
        lock(&self.state).odd.clone()
    }

    pub fn dms_status(&self) -> DmsStatus {
        lock(&self.state).dms.clone()
    }

    pub fn last_state_change_ms(&self) -> u64 {
        lock(&self.state).last_state_change_ms
    }

    /// Milliseconds since the last accepted engagement, if any.
    pub fn ms_since_last_update(&self) -> Option<u64> {
        let last = lock(&self.state).last_engagement_update_ms?;
        Some(self.clock.elapsed_ms().saturating_sub(last))
    }
}
