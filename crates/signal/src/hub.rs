//! Signal Hub
//!
//! Central registry of named vehicle signals. Every incoming value is range
//! checked, plausibility checked against its rate-of-change limit, and aged
//! against its freshness window on each scheduler tick. The number of signals
//! that have left `Valid` is aggregated into a single degraded-mode flag.
//!
//! Registration and operation are separate phases: once the first update is
//! accepted, the set of signals is frozen.

use crate::definition::{SignalData, SignalDefinition, SignalValidity, SignalValue};
use crate::error::{SignalError, SignalResult};
use hmicore_core::notify::lock;
use hmicore_core::{Notifier, SharedClock};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Notifications raised by the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalHubEvent {
    SignalUpdated {
        id: String,
        value: SignalValue,
    },
    ValidityChanged {
        id: String,
        old: SignalValidity,
        new: SignalValidity,
    },
    DegradedModeChanged(bool),
}

#[derive(Debug)]
struct SignalState {
    definition: SignalDefinition,
    current: SignalValue,
    /// Counted in the hub-wide invalid total
    counted_invalid: bool,
}

#[derive(Debug, Default)]
struct HubState {
    signals: HashMap<String, SignalState>,
    order: Vec<String>,
    accepting_updates: bool,
    invalid_count: u32,
    degraded: bool,
}

impl HubState {
    /// Update the invalid total for one signal's validity change.
    fn track_validity(&mut self, id: &str, old: SignalValidity, new: SignalValidity) {
        let Some(state) = self.signals.get_mut(id) else {
            return;
        };

        if old == SignalValidity::Valid && new != SignalValidity::Valid && !state.counted_invalid {
            state.counted_invalid = true;
            self.invalid_count += 1;
        } else if new == SignalValidity::Valid && state.counted_invalid {
            state.counted_invalid = false;
            self.invalid_count = self.invalid_count.saturating_sub(1);
        }
    }

    /// Re-derive the degraded flag. Returns the new value if it flipped.
    fn refresh_degraded(&mut self) -> Option<bool> {
        let should_be_degraded = self.invalid_count > 0;
        if should_be_degraded != self.degraded {
            self.degraded = should_be_degraded;
            Some(should_be_degraded)
        } else {
            None
        }
    }
}

/// Central signal registry.
pub struct SignalHub {
    clock: SharedClock,
    state: Mutex<HubState>,
    events: Notifier<SignalHubEvent>,
}

impl SignalHub {
    /// Create an empty hub
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            state: Mutex::new(HubState::default()),
            events: Notifier::new(),
        }
    }

    /// Notification registry
    pub fn events(&self) -> &Notifier<SignalHubEvent> {
        &self.events
    }

    /// Register a signal.
    ///
    /// Fails for an empty or duplicate identifier, and for any registration
    /// after the hub has accepted its first update.
    pub fn register_signal(&self, definition: SignalDefinition) -> SignalResult<()> {
        if definition.id.is_empty() {
            return Err(SignalError::EmptyId);
        }

        let mut state = lock(&self.state);
        if state.accepting_updates {
            warn!(signal = %definition.id, "registration rejected after hub start");
            return Err(SignalError::RegistrationClosed(definition.id));
        }
        if state.signals.contains_key(&definition.id) {
            return Err(SignalError::Duplicate(definition.id));
        }

        debug!(signal = %definition.id, critical = definition.safety_critical, "signal registered");
        let id = definition.id.clone();
        let current = SignalValue::not_available(definition.default_value.clone());
        state.order.push(id.clone());
        state.signals.insert(
            id,
            SignalState {
                definition,
                current,
                counted_invalid: false,
            },
        );
        Ok(())
    }

    /// Accept a new value for a registered signal.
    ///
    /// Returns `Ok(true)` if the stored value is `Valid` after range and
    /// rate-of-change checks. Unknown identifiers fail without side effects.
    pub fn update_signal(
        &self,
        id: &str,
        value: impl Into<SignalData>,
        source_timestamp_ms: Option<u64>,
    ) -> SignalResult<bool> {
        let value = value.into();
        let now_ms = self.clock.elapsed_ms();

        let (snapshot, old_validity, degraded_flip) = {
            let mut guard = lock(&self.state);
            let hub = &mut *guard;

            let Some(signal) = hub.signals.get_mut(id) else {
                warn!(signal = id, "update for unknown signal");
                return Err(SignalError::UnknownSignal(id.to_string()));
            };

            if !hub.accepting_updates {
                hub.accepting_updates = true;
                info!("signal hub accepting updates, registration closed");
            }

            let definition = &signal.definition;
            let old_validity = signal.current.validity;
            let mut new_validity = SignalValidity::Valid;
            let mut final_value = value.clone();

            let non_finite = value.as_f64().is_some_and(|n| !n.is_finite());
            if non_finite {
                final_value = definition.default_value.clone();
                new_validity = SignalValidity::Invalid;
                warn!(signal = id, value = %value, "non-finite numeric value rejected");
            } else if !definition.in_range(&value) {
                final_value = definition.clamp(&value);
                if definition.safety_critical {
                    new_validity = SignalValidity::OutOfRange;
                    warn!(signal = id, value = %value, clamped = %final_value, "critical signal out of range");
                } else {
                    debug!(signal = id, value = %value, clamped = %final_value, "signal clamped");
                }
            }

            if !non_finite
                && definition.max_rate_of_change > 0.0
                && old_validity == SignalValidity::Valid
            {
                if let Some(rate) = rate_per_second(&signal.current, &value, now_ms) {
                    if rate > definition.max_rate_of_change {
                        new_validity = SignalValidity::Invalid;
                        warn!(
                            signal = id,
                            rate,
                            limit = definition.max_rate_of_change,
                            "rate-of-change violation"
                        );
                    }
                }
            }

            signal.current = SignalValue {
                value: final_value,
                validity: new_validity,
                timestamp_ms: now_ms,
                source_timestamp_ms,
                update_count: signal.current.update_count.wrapping_add(1),
            };
            let snapshot = signal.current.clone();

            hub.track_validity(id, old_validity, new_validity);
            let degraded_flip = hub.refresh_degraded();
            (snapshot, old_validity, degraded_flip)
        };

        let valid = snapshot.is_valid();
        let new_validity = snapshot.validity;
        let mut pending = vec![SignalHubEvent::SignalUpdated {
            id: id.to_string(),
            value: snapshot,
        }];
        if old_validity != new_validity {
            pending.push(SignalHubEvent::ValidityChanged {
                id: id.to_string(),
                old: old_validity,
                new: new_validity,
            });
        }
        if let Some(degraded) = degraded_flip {
            info!(degraded, "signal hub degraded mode changed");
            pending.push(SignalHubEvent::DegradedModeChanged(degraded));
        }
        self.events.emit_all(pending);

        Ok(valid)
    }

    /// Demote every `Valid` signal older than its freshness window to `Stale`.
    ///
    /// Returns the number of signals demoted by this call. Calling it again
    /// without new updates demotes nothing and notifies nothing.
    pub fn check_freshness(&self) -> usize {
        let now_ms = self.clock.elapsed_ms();
        let mut pending = Vec::new();

        {
            let mut guard = lock(&self.state);
            let hub = &mut *guard;
            let mut demoted = Vec::new();

            for id in &hub.order {
                let Some(signal) = hub.signals.get_mut(id) else {
                    continue;
                };
                if signal.current.validity != SignalValidity::Valid {
                    continue;
                }
                let age = now_ms.saturating_sub(signal.current.timestamp_ms);
                if age > signal.definition.freshness_ms {
                    signal.current.validity = SignalValidity::Stale;
                    debug!(signal = %id, age_ms = age, "signal stale");
                    demoted.push(id.clone());
                }
            }

            for id in &demoted {
                hub.track_validity(id, SignalValidity::Valid, SignalValidity::Stale);
                pending.push(SignalHubEvent::ValidityChanged {
                    id: id.clone(),
                    old: SignalValidity::Valid,
                    new: SignalValidity::Stale,
                });
            }

            if let Some(degraded) = hub.refresh_degraded() {
                info!(degraded, "signal hub degraded mode changed");
                pending.push(SignalHubEvent::DegradedModeChanged(degraded));
            }
        }

        let demoted = pending
            .iter()
            .filter(|e| matches!(e, SignalHubEvent::ValidityChanged { .. }))
            .count();
        self.events.emit_all(pending);
        demoted
    }

    /// Copy of a signal's current value. Unknown ids read as `NotAvailable`.
    pub fn signal(&self, id: &str) -> SignalValue {
        lock(&self.state)
            .signals
            .get(id)
            .map(|s| s.current.clone())
            .unwrap_or_else(|| SignalValue::not_available(SignalData::Number(0.0)))
    }

    /// Copy of a signal's definition
    pub fn definition(&self, id: &str) -> Option<SignalDefinition> {
        lock(&self.state)
            .signals
            .get(id)
            .map(|s| s.definition.clone())
    }

    /// Registered identifiers in registration order
    pub fn registered_signals(&self) -> Vec<String> {
        lock(&self.state).order.clone()
    }

    pub fn is_degraded_mode(&self) -> bool {
        lock(&self.state).degraded
    }

    /// Number of signals currently counted as having left `Valid`
    pub fn invalid_signal_count(&self) -> u32 {
        lock(&self.state).invalid_count
    }

    /// Whether registration has closed
    pub fn is_accepting_updates(&self) -> bool {
        lock(&self.state).accepting_updates
    }
}

/// Rate of change against the last accepted value, `None` when not computable.
fn rate_per_second(previous: &SignalValue, incoming: &SignalData, now_ms: u64) -> Option<f64> {
    let previous_value = previous.value.as_f64()?;
    let new_value = incoming.as_f64()?;
    let dt_ms = now_ms.checked_sub(previous.timestamp_ms)?;
    if dt_ms == 0 {
        return None;
    }
    Some((new_value - previous_value).abs() * 1000.0 / dt_ms as f64)
}
