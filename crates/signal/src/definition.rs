//! Signal definitions and values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default freshness window for a signal (ms)
pub const DEFAULT_FRESHNESS_MS: u64 = 300;

/// Typed signal payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalData {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SignalData {
    /// Numeric view, `None` for booleans and text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalData::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SignalData::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SignalData::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for SignalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalData::Bool(b) => write!(f, "{}", b),
            SignalData::Number(n) => write!(f, "{}", n),
            SignalData::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for SignalData {
    fn from(value: f64) -> Self {
        SignalData::Number(value)
    }
}

impl From<bool> for SignalData {
    fn from(value: bool) -> Self {
        SignalData::Bool(value)
    }
}

impl From<&str> for SignalData {
    fn from(value: &str) -> Self {
        SignalData::Text(value.to_string())
    }
}

impl From<String> for SignalData {
    fn from(value: String) -> Self {
        SignalData::Text(value)
    }
}

/// Validity of a signal as judged by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalValidity {
    /// Fresh and within all checks
    Valid,
    /// Older than its freshness window
    Stale,
    /// Outside its range (value has been clamped)
    OutOfRange,
    /// Failed a plausibility check
    Invalid,
    /// Never received
    NotAvailable,
}

/// Current state of one signal. Readers always receive a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalValue {
    pub value: SignalData,
    pub validity: SignalValidity,
    /// Monotonic time of the last accepted update (ms)
    pub timestamp_ms: u64,
    /// Timestamp supplied by the producer, if any
    pub source_timestamp_ms: Option<u64>,
    pub update_count: u32,
}

impl SignalValue {
    /// Value for a signal that has never been received.
    pub fn not_available(default: SignalData) -> Self {
        Self {
            value: default,
            validity: SignalValidity::NotAvailable,
            timestamp_ms: 0,
            source_timestamp_ms: None,
            update_count: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validity == SignalValidity::Valid
    }

    /// Whether the value may be shown at all (possibly with a stale marker).
    pub fn is_displayable(&self) -> bool {
        matches!(self.validity, SignalValidity::Valid | SignalValidity::Stale)
    }
}

/// Immutable description of a signal, registered before steady state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDefinition {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub default_value: SignalData,
    pub freshness_ms: u64,
    /// Maximum change per second, 0 disables the check
    pub max_rate_of_change: f64,
    pub safety_critical: bool,
}

impl SignalDefinition {
    /// Definition with no range, no rate limit and the default freshness window.
    pub fn new(id: impl Into<String>, default_value: impl Into<SignalData>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            unit: String::new(),
            min_value: None,
            max_value: None,
            default_value: default_value.into(),
            freshness_ms: DEFAULT_FRESHNESS_MS,
            max_rate_of_change: 0.0,
            safety_critical: false,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn freshness_ms(mut self, freshness_ms: u64) -> Self {
        self.freshness_ms = freshness_ms;
        self
    }

    pub fn max_rate(mut self, per_second: f64) -> Self {
        self.max_rate_of_change = per_second;
        self
    }

    pub fn safety_critical(mut self, critical: bool) -> Self {
        self.safety_critical = critical;
        self
    }

    /// Whether a value satisfies the range. Non-numeric values always pass,
    /// NaN and infinities never do.
    pub fn in_range(&self, value: &SignalData) -> bool {
        let Some(n) = value.as_f64() else {
            return true;
        };
        if !n.is_finite() {
            return false;
        }
        if self.min_value.is_some_and(|min| n < min) {
            return false;
        }
        if self.max_value.is_some_and(|max| n > max) {
            return false;
        }
        true
    }

    /// Clamp into range. Non-numeric values fall back to the default.
    pub fn clamp(&self, value: &SignalData) -> SignalData {
        let Some(mut n) = value.as_f64() else {
            return self.default_value.clone();
        };
        if let Some(min) = self.min_value {
            n = n.max(min);
        }
        if let Some(max) = self.max_value {
            n = n.min(max);
        }
        SignalData::Number(n)
    }
}
