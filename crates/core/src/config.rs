//! Startup configuration for the HMI core.
//!
//! All thresholds are fixed once the runtime is constructed; there is no
//! runtime reconfiguration path.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
#[cfg(feature = "toml")]
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmiConfig {
    pub scheduler: SchedulerConfig,
    pub signals: SignalConfig,
    pub adas: AdasConfig,
    pub takeover: TakeoverConfig,
    pub perception: PerceptionConfig,
    pub event_log: EventLogConfig,
    pub logging: LoggingConfig,
}

/// Deterministic scheduler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Rate driving signal freshness and state-machine ticks
    pub signal_tick_hz: u32,
    /// Rate reserved for render consumers
    pub render_tick_hz: u32,
    /// Jitter above which a warning is raised (microseconds)
    pub jitter_threshold_us: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            signal_tick_hz: 20,
            render_tick_hz: 60,
            jitter_threshold_us: 5_000,
        }
    }
}

/// Signal hub settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Register the standard cluster signal catalog at startup
    pub register_cluster_catalog: bool,
    /// Upper bound of the engine speed signal
    pub max_rpm: f64,
    /// Propagate hub degraded mode into the ADAS state service
    pub degrade_adas_on_signal_loss: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            register_cluster_catalog: true,
            max_rpm: 8_000.0,
            degrade_adas_on_signal_loss: true,
        }
    }
}

/// ADAS state service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdasConfig {
    /// Engagement freshness window (ms)
    pub freshness_window_ms: u64,
}

impl Default for AdasConfig {
    fn default() -> Self {
        Self {
            freshness_window_ms: 300,
        }
    }
}

/// Takeover escalation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeoverConfig {
    /// Time without acknowledgment before the next escalation step (ms)
    pub escalation_interval_ms: u64,
    /// Remaining countdown at which critical escalation is forced (seconds)
    pub critical_countdown_sec: f64,
    /// Maximum number of time-based escalation steps
    pub max_escalation_level: u32,
}

impl Default for TakeoverConfig {
    fn default() -> Self {
        Self {
            escalation_interval_ms: 5_000,
            critical_countdown_sec: 3.0,
            max_escalation_level: 3,
        }
    }
}

/// Perception cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Per-topic freshness window (ms)
    pub freshness_window_ms: u64,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            freshness_window_ms: 200,
        }
    }
}

/// Audit event log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    /// Events retained before the oldest are dropped
    pub max_events: usize,
    /// Session identifier opened at startup
    pub session_id: Option<String>,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            max_events: 10_000,
            session_id: None,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            default_filter: "info".to_string(),
        }
    }
}

impl HmiConfig {
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| CoreError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self::default()
    }

    /// Reject values that would stall the scheduler or disable gating.
    pub fn validate(&self) -> CoreResult<()> {
        if self.scheduler.signal_tick_hz == 0 || self.scheduler.render_tick_hz == 0 {
            return Err(CoreError::InvalidConfig(
                "scheduler tick rates must be non-zero".to_string(),
            ));
        }
        if self.adas.freshness_window_ms == 0 || self.perception.freshness_window_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "freshness windows must be non-zero".to_string(),
            ));
        }
        if self.takeover.escalation_interval_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "takeover escalation interval must be non-zero".to_string(),
            ));
        }
        let critical = self.takeover.critical_countdown_sec;
        if critical.is_nan() || critical < 0.0 {
            return Err(CoreError::InvalidConfig(
                "critical countdown must be a non-negative number".to_string(),
            ));
        }
        if self.event_log.max_events == 0 {
            return Err(CoreError::InvalidConfig(
                "event log must retain at least one event".to_string(),
            ));
        }
        Ok(())
    }
}
