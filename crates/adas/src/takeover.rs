//! Takeover request pipeline.
//!
//! Drives the escalation ladder from a pre-warning through to a minimal risk
//! maneuver (MRM) when the driver does not respond. The countdown is anchored
//! to the shared monotonic clock when a request arrives and evaluated on each
//! scheduler tick.

use crate::engagement::TakeoverRequest;
use crate::types::TakeoverUrgency;
use hmicore_core::notify::lock;
use hmicore_core::{Notifier, SharedClock};
use hmicore_sched::TickInfo;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Lead time for a pre-warning ahead of an ODD exit (s)
pub const PRE_WARNING_TIME_SEC: f64 = 30.0;
/// Default time allowed for a takeover (s)
pub const REQUEST_TIMEOUT_SEC: f64 = 10.0;
pub const DEFAULT_ESCALATION_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_CRITICAL_THRESHOLD_SEC: f64 = 3.0;
pub const DEFAULT_MAX_ESCALATION_LEVEL: u32 = 3;

/// MRM reason when the countdown expires
pub const MRM_REASON_TIMEOUT: &str = "timeout";
/// MRM reason when escalation runs past the critical step
pub const MRM_REASON_MAX_ESCALATION: &str = "max_escalation";

/// Takeover pipeline state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TakeoverState {
    #[default]
    Inactive,
    PreWarning,
    RequestActive,
    Escalated,
    CriticalEscalation,
    MrmInitiated,
    Completed,
}

impl TakeoverState {
    /// Urgency presented for this state.
    pub fn urgency(self) -> TakeoverUrgency {
        match self {
            Self::Inactive | Self::Completed => TakeoverUrgency::None,
            Self::PreWarning => TakeoverUrgency::Advisory,
            Self::RequestActive => TakeoverUrgency::Warning,
            Self::Escalated => TakeoverUrgency::Immediate,
            Self::CriticalEscalation | Self::MrmInitiated => TakeoverUrgency::Critical,
        }
    }

    /// Initial state for a request of the given urgency.
    pub fn for_urgency(urgency: TakeoverUrgency) -> Self {
        match urgency {
            TakeoverUrgency::None | TakeoverUrgency::Advisory => Self::PreWarning,
            TakeoverUrgency::Warning => Self::RequestActive,
            TakeoverUrgency::Immediate => Self::Escalated,
            TakeoverUrgency::Critical => Self::CriticalEscalation,
        }
    }

    /// States the countdown and escalation ladder run in.
    fn is_escalating(self) -> bool {
        matches!(
            self,
            Self::PreWarning | Self::RequestActive | Self::Escalated | Self::CriticalEscalation
        )
    }
}

/// Escalation thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TakeoverThresholds {
    pub escalation_interval_ms: u64,
    pub critical_countdown_sec: f64,
    pub max_escalation_level: u32,
}

impl Default for TakeoverThresholds {
    fn default() -> Self {
        Self {
            escalation_interval_ms: DEFAULT_ESCALATION_INTERVAL_MS,
            critical_countdown_sec: DEFAULT_CRITICAL_THRESHOLD_SEC,
            max_escalation_level: DEFAULT_MAX_ESCALATION_LEVEL,
        }
    }
}

/// Notifications raised by the takeover manager.
#[derive(Debug, Clone, PartialEq)]
pub enum TakeoverEvent {
    StateChanged {
        from: TakeoverState,
        to: TakeoverState,
    },
    UrgencyChanged(TakeoverUrgency),
    CountdownChanged(f64),
    MessageChanged(String),
    TakeoverRequested,
    TakeoverEscalated {
        level: u32,
    },
    TakeoverCompleted,
    TakeoverCancelled,
    MrmStarted {
        reason: String,
    },
    /// Audio alert trigger; playback is left to the presentation layer
    PlayAudio(TakeoverUrgency),
    /// Haptic alert trigger
    ActivateHaptic(TakeoverUrgency),
}

#[derive(Debug, Default)]
struct Pipeline {
    state: TakeoverState,
    urgency: TakeoverUrgency,
    initial_countdown: f64,
    remaining_countdown: f64,
    countdown_start_ms: u64,
    last_escalation_ms: u64,
    escalation_level: u32,
    reason: String,
    required_action: String,
    message: String,
    audio_active: bool,
    haptic_active: bool,
}

impl Pipeline {
    fn has_countdown(&self) -> bool {
        self.initial_countdown > 0.0
    }

    fn compose_message(&self) -> String {
        match self.state {
            TakeoverState::Inactive => String::new(),
            TakeoverState::PreWarning => {
                with_detail("Prepare to take over driving", &self.reason)
            }
            TakeoverState::RequestActive => {
                if self.remaining_countdown > 0.0 {
                    format!(
                        "TAKE OVER DRIVING NOW\n{:.0} seconds",
                        self.remaining_countdown
                    )
                } else {
                    "TAKE OVER DRIVING NOW".to_string()
                }
            }
            TakeoverState::Escalated => {
                with_detail("TAKE OVER IMMEDIATELY", &self.required_action)
            }
            TakeoverState::CriticalEscalation => {
                "CRITICAL: TAKE OVER NOW\nSystem will perform safe stop".to_string()
            }
            TakeoverState::MrmInitiated => {
                "System Performing Safe Stop\nVehicle is stopping safely".to_string()
            }
            TakeoverState::Completed => "Takeover Complete\nYou are now driving".to_string(),
        }
    }

    fn refresh_message(&mut self, pending: &mut Vec<TakeoverEvent>) {
        let message = self.compose_message();
        if message != self.message {
            self.message = message.clone();
            pending.push(TakeoverEvent::MessageChanged(message));
        }
    }

    /// Move to `to`, queueing notifications and side effects.
    fn transition(&mut self, to: TakeoverState, pending: &mut Vec<TakeoverEvent>) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;

        if matches!(to, TakeoverState::Inactive | TakeoverState::Completed) {
            self.escalation_level = 0;
            self.audio_active = false;
            self.haptic_active = false;
        }

        pending.push(TakeoverEvent::StateChanged { from, to });
        let urgency = to.urgency();
        if urgency != self.urgency {
            self.urgency = urgency;
            pending.push(TakeoverEvent::UrgencyChanged(urgency));
        }

        match to {
            TakeoverState::RequestActive => {
                pending.push(TakeoverEvent::TakeoverRequested);
                pending.push(TakeoverEvent::PlayAudio(TakeoverUrgency::Warning));
            }
            TakeoverState::Escalated | TakeoverState::CriticalEscalation => {
                pending.push(TakeoverEvent::TakeoverEscalated {
                    level: self.escalation_level,
                });
                pending.push(TakeoverEvent::PlayAudio(urgency));
                pending.push(TakeoverEvent::ActivateHaptic(urgency));
            }
            TakeoverState::MrmInitiated => {
                pending.push(TakeoverEvent::MrmStarted {
                    reason: self.reason.clone(),
                });
            }
            _ => {}
        }

        self.refresh_message(pending);
    }

    /// Enter MRM. Repeated calls while in MRM do nothing.
    fn force_mrm(&mut self, reason: &str, pending: &mut Vec<TakeoverEvent>) {
        if self.state == TakeoverState::MrmInitiated {
            return;
        }
        error!(reason, "minimal risk maneuver initiated");
        self.reason = reason.to_string();
        self.transition(TakeoverState::MrmInitiated, pending);
    }
}

fn with_detail(headline: &str, detail: &str) -> String {
    if detail.is_empty() {
        headline.to_string()
    } else {
        format!("{}\n{}", headline, detail)
    }
}

/// Takeover request state machine.
pub struct TakeoverManager {
    clock: SharedClock,
    thresholds: TakeoverThresholds,
    pipeline: Mutex<Pipeline>,
    events: Notifier<TakeoverEvent>,
}

impl TakeoverManager {
    pub fn new(clock: SharedClock) -> Self {
        Self::with_thresholds(clock, TakeoverThresholds::default())
    }

    pub fn with_thresholds(clock: SharedClock, thresholds: TakeoverThresholds) -> Self {
        Self {
            clock,
            thresholds,
            pipeline: Mutex::new(Pipeline::default()),
            events: Notifier::new(),
        }
    }

    pub fn events(&self) -> &Notifier<TakeoverEvent> {
        &self.events
    }

    pub fn thresholds(&self) -> TakeoverThresholds {
        self.thresholds
    }

    /// Apply a takeover request.
    ///
    /// An inactive request cancels a takeover in progress. An active request
    /// re-anchors the countdown to the request's value. A request arriving
    /// while a takeover is already escalating never lowers the current step,
    /// and requests are ignored once MRM has started.
    pub fn update_from_request(&self, request: &TakeoverRequest) {
        if !request.active {
            if self.is_active() {
                self.cancel_takeover();
            }
            return;
        }

        let now = self.clock.elapsed_ms();
        let mut pending = Vec::new();
        {
            let mut p = lock(&self.pipeline);
            if p.state == TakeoverState::MrmInitiated {
                debug!("takeover request ignored during MRM");
                return;
            }

            let fresh = !p.state.is_escalating();
            if fresh {
                p.escalation_level = 0;
                p.last_escalation_ms = now;
            }

            p.reason = request.reason.clone();
            p.required_action = request.required_action.clone();
            p.initial_countdown = request.countdown_sec.max(0.0);
            p.remaining_countdown = p.initial_countdown;
            p.countdown_start_ms = now;
            p.audio_active = request.audio_active;
            p.haptic_active = request.haptic_active;
            pending.push(TakeoverEvent::CountdownChanged(p.remaining_countdown));

            let requested = TakeoverState::for_urgency(request.urgency);
            let target = if fresh || requested.urgency() > p.state.urgency() {
                requested
            } else {
                p.state
            };
            info!(
                urgency = ?request.urgency,
                countdown_sec = request.countdown_sec,
                state = ?target,
                "takeover request"
            );
            p.transition(target, &mut pending);
            p.refresh_message(&mut pending);
        }
        self.events.emit_all(pending);
    }

    /// Advance the countdown and the escalation ladder.
    pub fn process_tick(&self, tick: TickInfo) {
        let now = self.clock.elapsed_ms();
        let mut pending = Vec::new();
        {
            let mut p = lock(&self.pipeline);
            if !p.state.is_escalating() {
                return;
            }

            if p.has_countdown() {
                let elapsed_sec = now.saturating_sub(p.countdown_start_ms) as f64 / 1000.0;
                let remaining = (p.initial_countdown - elapsed_sec).max(0.0);
                if remaining != p.remaining_countdown {
                    p.remaining_countdown = remaining;
                    pending.push(TakeoverEvent::CountdownChanged(remaining));
                    p.refresh_message(&mut pending);
                }
            }

            self.check_escalation(&mut p, now, tick, &mut pending);
        }
        self.events.emit_all(pending);
    }

    fn check_escalation(
        &self,
        p: &mut Pipeline,
        now: u64,
        tick: TickInfo,
        pending: &mut Vec<TakeoverEvent>,
    ) {
        if p.has_countdown() && p.remaining_countdown <= 0.0 {
            warn!(tick = tick.tick_number, "takeover countdown expired");
            p.force_mrm(MRM_REASON_TIMEOUT, pending);
            return;
        }

        let since_escalation = now.saturating_sub(p.last_escalation_ms);
        let may_escalate = p.escalation_level < self.thresholds.max_escalation_level
            || p.state == TakeoverState::CriticalEscalation;
        if since_escalation > self.thresholds.escalation_interval_ms && may_escalate {
            p.last_escalation_ms = now;
            p.escalation_level = (p.escalation_level + 1).min(self.thresholds.max_escalation_level);
            p.audio_active = true;
            p.haptic_active = true;
            warn!(level = p.escalation_level, state = ?p.state, "takeover escalating");

            let next = match p.state {
                TakeoverState::PreWarning => TakeoverState::RequestActive,
                TakeoverState::RequestActive => TakeoverState::Escalated,
                TakeoverState::Escalated => TakeoverState::CriticalEscalation,
                _ => {
                    p.force_mrm(MRM_REASON_MAX_ESCALATION, pending);
                    return;
                }
            };
            p.transition(next, pending);
        }

        if p.has_countdown()
            && p.remaining_countdown <= self.thresholds.critical_countdown_sec
            && p.state != TakeoverState::CriticalEscalation
        {
            p.transition(TakeoverState::CriticalEscalation, pending);
        }
    }

    /// Driver took control. Returns false when no takeover was escalating.
    pub fn acknowledge_takeover(&self) -> bool {
        let mut pending = Vec::new();
        {
            let mut p = lock(&self.pipeline);
            if !p.state.is_escalating() {
                return false;
            }
            info!(level = p.escalation_level, "takeover acknowledged");
            p.transition(TakeoverState::Completed, &mut pending);
            pending.push(TakeoverEvent::TakeoverCompleted);
        }
        self.events.emit_all(pending);
        true
    }

    /// Abort any takeover, including an MRM, back to `Inactive`.
    pub fn cancel_takeover(&self) {
        let mut pending = Vec::new();
        {
            let mut p = lock(&self.pipeline);
            if p.state == TakeoverState::Inactive {
                return;
            }
            info!(state = ?p.state, "takeover cancelled");
            p.transition(TakeoverState::Inactive, &mut pending);
            p.initial_countdown = 0.0;
            p.remaining_countdown = 0.0;
            pending.push(TakeoverEvent::TakeoverCancelled);
        }
        self.events.emit_all(pending);
    }

    /// Start a minimal risk maneuver. MrmStarted fires once per maneuver.
    pub fn force_mrm(&self, reason: &str) {
        let mut pending = Vec::new();
        lock(&self.pipeline).force_mrm(reason, &mut pending);
        self.events.emit_all(pending);
    }

    /// Clear all takeover state without a cancellation notice.
    pub fn reset(&self) {
        let mut pending = Vec::new();
        {
            let mut p = lock(&self.pipeline);
            p.transition(TakeoverState::Inactive, &mut pending);
            let message = std::mem::take(&mut p.message);
            *p = Pipeline {
                message,
                ..Pipeline::default()
            };
            p.refresh_message(&mut pending);
        }
        self.events.emit_all(pending);
    }

    pub fn state(&self) -> TakeoverState {
        lock(&self.pipeline).state
    }

    pub fn urgency(&self) -> TakeoverUrgency {
        lock(&self.pipeline).urgency
    }

    /// Any state other than `Inactive` and `Completed`, MRM included.
    pub fn is_active(&self) -> bool {
        !matches!(
            lock(&self.pipeline).state,
            TakeoverState::Inactive | TakeoverState::Completed
        )
    }

    pub fn is_mrm_active(&self) -> bool {
        lock(&self.pipeline).state == TakeoverState::MrmInitiated
    }

    pub fn requires_immediate_action(&self) -> bool {
        let p = lock(&self.pipeline);
        let active = !matches!(p.state, TakeoverState::Inactive | TakeoverState::Completed);
        active
            && (p.urgency >= TakeoverUrgency::Immediate
                || (p.has_countdown()
                    && p.remaining_countdown <= self.thresholds.critical_countdown_sec))
    }

    pub fn remaining_countdown(&self) -> f64 {
        lock(&self.pipeline).remaining_countdown
    }

    pub fn escalation_level(&self) -> u32 {
        lock(&self.pipeline).escalation_level
    }

    pub fn message(&self) -> String {
        lock(&self.pipeline).message.clone()
    }

    pub fn reason(&self) -> String {
        lock(&self.pipeline).reason.clone()
    }

    pub fn required_action(&self) -> String {
        lock(&self.pipeline).required_action.clone()
    }

    pub fn audio_active(&self) -> bool {
        lock(&self.pipeline).audio_active
    }

    pub fn haptic_active(&self) -> bool {
        lock(&self.pipeline).haptic_active
    }
}
