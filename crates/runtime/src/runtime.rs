//! Component wiring for the HMI core.
//!
//! [`HmiRuntime`] owns one instance of every component, drives them from a
//! single scheduler timeline and routes their notifications into the audit
//! log and into each other.
//!
//! Tick order is fixed: signal freshness, perception, ADAS state, takeover.
//! A second scheduler runs at the render rate for presentation callbacks;
//! nothing in the core is evaluated on it.
//! Observers hold weak references so no component keeps another alive
//! through its own notifier.

use crate::error::RuntimeResult;
use crate::message::InboundMessage;
use hmicore_adas::{
    AdasEvent, AdasHmiState, AdasStateService, HmiEventLog, OddStatus, PerceptionEvent,
    PerceptionModel, TakeoverEvent, TakeoverManager, TakeoverState, TakeoverThresholds,
};
use hmicore_core::notify::lock;
use hmicore_core::{
    event_types, EventBuilder, EventCategory, EventSeverity, HmiConfig, SharedClock,
};
use hmicore_sched::{DeterministicScheduler, SchedulerEvent, SchedulerStats, TickInfo};
use hmicore_signal::validator::validate_gear;
use hmicore_signal::{register_cluster_signals, signal_ids, SignalData, SignalHub, SignalHubEvent};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Fully wired HMI core.
pub struct HmiRuntime {
    config: HmiConfig,
    clock: SharedClock,
    scheduler: Arc<DeterministicScheduler>,
    render_scheduler: Arc<DeterministicScheduler>,
    hub: Arc<SignalHub>,
    adas: Arc<AdasStateService>,
    takeover: Arc<TakeoverManager>,
    perception: Arc<PerceptionModel>,
    event_log: Arc<HmiEventLog>,
}

impl HmiRuntime {
    /// Build and wire every component from a validated configuration.
    pub fn new(config: HmiConfig, clock: SharedClock) -> RuntimeResult<Self> {
        config.validate()?;

        let scheduler = Arc::new(DeterministicScheduler::with_jitter_threshold(
            clock.clone(),
            config.scheduler.jitter_threshold_us,
        ));
        let render_scheduler = Arc::new(DeterministicScheduler::with_jitter_threshold(
            clock.clone(),
            config.scheduler.jitter_threshold_us,
        ));
        let hub = Arc::new(SignalHub::new(clock.clone()));
        let adas = Arc::new(AdasStateService::with_freshness_window(
            clock.clone(),
            config.adas.freshness_window_ms,
        ));
        let takeover = Arc::new(TakeoverManager::with_thresholds(
            clock.clone(),
            TakeoverThresholds {
                escalation_interval_ms: config.takeover.escalation_interval_ms,
                critical_countdown_sec: config.takeover.critical_countdown_sec,
                max_escalation_level: config.takeover.max_escalation_level,
            },
        ));
        let perception = Arc::new(PerceptionModel::with_freshness_window(
            clock.clone(),
            config.perception.freshness_window_ms,
        ));
        let event_log = Arc::new(HmiEventLog::with_capacity(
            clock.clone(),
            config.event_log.max_events,
        ));

        if config.signals.register_cluster_catalog {
            register_cluster_signals(&hub, config.signals.max_rpm)?;
        }

        let runtime = Self {
            config,
            clock,
            scheduler,
            render_scheduler,
            hub,
            adas,
            takeover,
            perception,
            event_log,
        };
        runtime.wire_tick_order();
        runtime.wire_adas();
        runtime.wire_takeover();
        runtime.wire_perception();
        runtime.wire_hub();
        runtime.wire_scheduler();

        info!(
            signals = runtime.hub.registered_signals().len(),
            signal_tick_hz = runtime.config.scheduler.signal_tick_hz,
            "hmi runtime constructed"
        );
        Ok(runtime)
    }

    fn wire_tick_order(&self) {
        let hub = Arc::downgrade(&self.hub);
        let perception = Arc::downgrade(&self.perception);
        let adas = Arc::downgrade(&self.adas);
        let takeover = Arc::downgrade(&self.takeover);

        self.scheduler.register_callback(move |tick: TickInfo| {
            if let Some(hub) = hub.upgrade() {
                hub.check_freshness();
            }
            if let Some(perception) = perception.upgrade() {
                perception.process_tick(tick);
            }
            if let Some(adas) = adas.upgrade() {
                adas.process_tick(tick);
            }
            if let Some(takeover) = takeover.upgrade() {
                takeover.process_tick(tick);
            }
        });
    }

    fn wire_adas(&self) {
        let log = Arc::clone(&self.event_log);
        let adas = Arc::downgrade(&self.adas);
        let last_odd = Mutex::new(OddStatus::Unknown);

        self.adas.events().subscribe(move |event: &AdasEvent| {
            let Some(adas) = adas.upgrade() else {
                return;
            };
            match event {
                AdasEvent::HmiStateChanged { from, to } => {
                    log.set_current_state(*to, adas.automation_level());
                    log.log_state_change(*from, *to, "");
                }
                AdasEvent::EngagementUpdated(_) => {
                    // Level changes do not always move the HMI state
                    log.set_current_state(adas.hmi_state(), adas.automation_level());
                }
                AdasEvent::EngagedChanged(engaged) => {
                    log.log_engagement(*engaged, adas.automation_level());
                }
                AdasEvent::StaleStateDetected => {
                    log.log_fault(
                        "adas_state",
                        "Engagement data stale",
                        EventSeverity::Warning,
                    );
                }
                AdasEvent::IntegrityFailure(reason) => {
                    log.log_security_event(event_types::INTEGRITY_FAILURE, reason);
                }
                AdasEvent::StateTransitionBlocked { from, to, reason } => {
                    log.log_security_event(
                        event_types::TRANSITION_BLOCKED,
                        &format!("{}: {} -> {}", reason, from.text(), to.text()),
                    );
                }
                AdasEvent::OddStatusUpdated(odd) => {
                    let mut last = lock(&last_odd);
                    if *last != odd.status {
                        *last = odd.status;
                        log.log_odd_event(odd.status, &odd.odd_reasons.join(", "));
                    }
                }
                _ => {}
            }
        });
    }

    fn wire_takeover(&self) {
        let log = Arc::clone(&self.event_log);
        let adas = Arc::downgrade(&self.adas);
        let takeover = Arc::downgrade(&self.takeover);

        self.takeover.events().subscribe(move |event: &TakeoverEvent| {
            let (Some(adas), Some(takeover)) = (adas.upgrade(), takeover.upgrade()) else {
                return;
            };
            match event {
                TakeoverEvent::StateChanged { from, to }
                    if matches!(from, TakeoverState::Inactive | TakeoverState::Completed)
                        && !matches!(to, TakeoverState::Inactive | TakeoverState::Completed) =>
                {
                    if *to != TakeoverState::MrmInitiated {
                        log.log_takeover_request(to.urgency(), &takeover.reason());
                    }
                    if adas.hmi_state() == AdasHmiState::EngagedL3 {
                        let _ = adas.request_state_transition(AdasHmiState::TakeoverRequested);
                    }
                }
                TakeoverEvent::TakeoverEscalated { level } => {
                    log.log_takeover_escalation(*level, takeover.urgency());
                }
                TakeoverEvent::MrmStarted { reason } => {
                    log.log_mrm_event(reason);
                    // Blocked outside L3 supervision; the blocked transition is audited
                    let _ = adas.request_state_transition(AdasHmiState::MrmActive);
                }
                TakeoverEvent::TakeoverCompleted => {
                    log.log_takeover_response(true);
                    if adas.hmi_state() == AdasHmiState::TakeoverRequested {
                        let _ = adas.request_state_transition(AdasHmiState::Available);
                    }
                }
                TakeoverEvent::TakeoverCancelled => {
                    log.log_takeover_response(false);
                    if adas.hmi_state() == AdasHmiState::TakeoverRequested {
                        let _ = adas.request_state_transition(AdasHmiState::EngagedL3);
                    }
                }
                _ => {}
            }
        });
    }

    fn wire_perception(&self) {
        let log = Arc::clone(&self.event_log);
        self.perception
            .events()
            .subscribe(move |event: &PerceptionEvent| {
                if let PerceptionEvent::PerceptionDegraded(reason) = event {
                    log.log_perception_degraded(reason);
                }
            });
    }

    fn wire_hub(&self) {
        let log = Arc::clone(&self.event_log);
        let adas = Arc::downgrade(&self.adas);
        let degrade_adas = self.config.signals.degrade_adas_on_signal_loss;

        self.hub.events().subscribe(move |event: &SignalHubEvent| {
            if let SignalHubEvent::DegradedModeChanged(degraded) = event {
                let summary = if *degraded {
                    "Signal degraded mode entered"
                } else {
                    "Signal degraded mode cleared"
                };
                log.log(
                    EventBuilder::new(event_types::SIGNAL_DEGRADED, EventCategory::Fault)
                        .severity(if *degraded {
                            EventSeverity::Warning
                        } else {
                            EventSeverity::Info
                        })
                        .summary(summary)
                        .data("degraded", *degraded)
                        .build(),
                );
                if degrade_adas {
                    if let Some(adas) = adas.upgrade() {
                        adas.force_degraded_mode(*degraded);
                    }
                }
            }
        });
    }

    fn wire_scheduler(&self) {
        let timelines = [
            ("signal", &self.scheduler),
            ("render", &self.render_scheduler),
        ];
        for (timeline, scheduler) in timelines {
            scheduler
                .events()
                .subscribe(move |event: &SchedulerEvent| match event {
                    SchedulerEvent::Started { rate_hz } => {
                        debug!(timeline, rate_hz, "timeline armed")
                    }
                    SchedulerEvent::TickMissed { count } => {
                        debug!(timeline, count, "ticks missed")
                    }
                    _ => {}
                });
        }
    }

    /// Open the audit session and start the signal and render timelines.
    ///
    /// Requires a tokio runtime.
    pub fn start(&self) -> RuntimeResult<()> {
        self.open_session();
        self.scheduler
            .start(self.config.scheduler.signal_tick_hz)?;
        self.render_scheduler
            .start(self.config.scheduler.render_tick_hz)?;
        Ok(())
    }

    /// Open the audit session and arm the scheduler for [`tick`](Self::tick).
    pub fn start_manual(&self) -> RuntimeResult<()> {
        self.open_session();
        self.scheduler
            .start_manual(self.config.scheduler.signal_tick_hz)?;
        self.render_scheduler
            .start_manual(self.config.scheduler.render_tick_hz)?;
        Ok(())
    }

    fn open_session(&self) {
        let session_id = self
            .config
            .event_log
            .session_id
            .clone()
            .unwrap_or_else(|| format!("session-{}", self.clock.elapsed_ms()));
        self.event_log.start_session(&session_id);
    }

    /// Run one scheduler tick by hand.
    pub fn tick(&self) -> Option<TickInfo> {
        self.scheduler.on_timer()
    }

    /// Stop ticking and close the audit session.
    pub fn stop(&self) {
        if !self.scheduler.is_running() {
            return;
        }
        self.scheduler.stop();
        self.render_scheduler.stop();
        self.event_log.end_session();
    }

    /// Route one inbound message.
    ///
    /// Returns whether the component accepted it. Rejections by the
    /// component (replayed sequence, invalid gear) are `Ok(false)`; only an
    /// unknown signal identifier is an error.
    pub fn dispatch(&self, message: InboundMessage) -> RuntimeResult<bool> {
        debug!(kind = message.kind(), "dispatch");
        match message {
            InboundMessage::Signal {
                id,
                value,
                source_timestamp_ms,
            } => {
                if id == signal_ids::GEAR_POSITION {
                    if let SignalData::Text(gear) = &value {
                        let result = validate_gear(gear);
                        if !result.passed {
                            warn!(gear = %gear, error = ?result.error_message, "gear rejected");
                            return Ok(false);
                        }
                    }
                }
                Ok(self.hub.update_signal(&id, value, source_timestamp_ms)?)
            }
            InboundMessage::Engagement(engagement) => {
                Ok(self.adas.update_engagement(engagement).is_ok())
            }
            InboundMessage::Odd(odd) => Ok(self.adas.update_odd_status(odd).is_ok()),
            InboundMessage::Dms(dms) => Ok(self.adas.update_dms_status(dms).is_ok()),
            InboundMessage::Takeover(request) => {
                self.takeover.update_from_request(&request);
                Ok(true)
            }
            InboundMessage::Lanes(lanes) => {
                self.perception.update_lane_model(lanes);
                Ok(true)
            }
            InboundMessage::Lead(lead) => {
                self.perception.update_lead_vehicle(lead);
                Ok(true)
            }
            InboundMessage::Objects(objects) => {
                self.perception.update_object_list(objects);
                Ok(true)
            }
            InboundMessage::Corridor(corridor) => {
                self.perception.update_corridor(corridor);
                Ok(true)
            }
            InboundMessage::AcknowledgeTakeover => {
                self.event_log
                    .log_user_action("acknowledge_takeover", "Driver acknowledged takeover");
                Ok(self.takeover.acknowledge_takeover())
            }
        }
    }

    pub fn config(&self) -> &HmiConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Arc<DeterministicScheduler> {
        &self.scheduler
    }

    /// Render-rate timeline for presentation callbacks.
    pub fn render_scheduler(&self) -> &Arc<DeterministicScheduler> {
        &self.render_scheduler
    }

    pub fn hub(&self) -> &Arc<SignalHub> {
        &self.hub
    }

    pub fn adas(&self) -> &Arc<AdasStateService> {
        &self.adas
    }

    pub fn takeover(&self) -> &Arc<TakeoverManager> {
        &self.takeover
    }

    pub fn perception(&self) -> &Arc<PerceptionModel> {
        &self.perception
    }

    pub fn event_log(&self) -> &Arc<HmiEventLog> {
        &self.event_log
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }
}

impl Drop for HmiRuntime {
    fn drop(&mut self) {
        self.scheduler.stop();
        self.render_scheduler.stop();
    }
}
