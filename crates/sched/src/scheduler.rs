//! Deterministic fixed-rate scheduler
//!
//! Drives every periodic evaluation in the HMI core from a single logical
//! timeline and measures its own timing health. Missed ticks are counted and
//! reported, never replayed: firing twice to catch up would break the
//! one-evaluation-per-period contract that freshness windows rely on.

use hmicore_core::notify::lock;
use hmicore_core::{Notifier, SharedClock};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Render loop rate (Hz)
pub const RENDER_TICK_HZ: u32 = 60;

/// Signal evaluation rate (Hz)
pub const SIGNAL_TICK_HZ: u32 = 20;

/// Default jitter warning threshold (5 ms)
pub const DEFAULT_JITTER_THRESHOLD_US: u64 = 5_000;

/// Smoothing factor for jitter and execution-time averages
const EMA_ALPHA: f64 = 0.1;

/// Scheduler error types
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Tick rate must be greater than zero")]
    ZeroRate,

    #[error("Tick rate {0} Hz exceeds millisecond resolution")]
    RateTooHigh(u32),

    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Arguments passed to every tick callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInfo {
    /// 1-based tick number since the last start
    pub tick_number: u64,
    /// Milliseconds since the last start
    pub elapsed_ms: u64,
}

/// Timing health counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Ticks fired since the last start
    pub tick_count: u64,
    /// Periods skipped because a tick arrived late
    pub missed_ticks: u64,
    /// Moving average of callback execution time (µs)
    pub avg_tick_duration_us: f64,
    /// Longest callback execution time observed (µs)
    pub max_tick_duration_us: u64,
    /// Moving average of |actual - expected| tick interval (µs)
    pub avg_jitter_us: f64,
}

/// Notifications raised by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SchedulerEvent {
    Started { rate_hz: u32 },
    Stopped,
    /// Periods elapsed without a tick
    TickMissed { count: u64 },
    /// Interval deviation above the configured threshold
    JitterExceeded { jitter_us: u64 },
}

/// Tick callback.
pub type TickCallback = Arc<dyn Fn(TickInfo) + Send + Sync>;

#[derive(Debug, Default)]
struct TimingState {
    running: bool,
    rate_hz: u32,
    interval_us: u64,
    start_us: u64,
    last_tick_us: Option<u64>,
    stats: SchedulerStats,
}

/// Fixed-rate tick generator.
pub struct DeterministicScheduler {
    clock: SharedClock,
    jitter_threshold_us: u64,
    timing: Mutex<TimingState>,
    callbacks: Mutex<Vec<TickCallback>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    events: Notifier<SchedulerEvent>,
}

impl DeterministicScheduler {
    /// Create a scheduler with the default jitter threshold
    pub fn new(clock: SharedClock) -> Self {
        Self::with_jitter_threshold(clock, DEFAULT_JITTER_THRESHOLD_US)
    }

    /// Create a scheduler with a custom jitter threshold
    pub fn with_jitter_threshold(clock: SharedClock, jitter_threshold_us: u64) -> Self {
        Self {
            clock,
            jitter_threshold_us,
            timing: Mutex::new(TimingState::default()),
            callbacks: Mutex::new(Vec::new()),
            driver: Mutex::new(None),
            events: Notifier::new(),
        }
    }

    /// Notification registry
    pub fn events(&self) -> &Notifier<SchedulerEvent> {
        &self.events
    }

    /// Register a tick callback. Callbacks run in registration order.
    pub fn register_callback<F>(&self, callback: F)
    where
        F: Fn(TickInfo) + Send + Sync + 'static,
    {
        lock(&self.callbacks).push(Arc::new(callback));
    }

    /// Remove every registered callback
    pub fn clear_callbacks(&self) {
        lock(&self.callbacks).clear();
    }

    /// Start ticking at `rate_hz` on the current tokio runtime.
    ///
    /// Restarts with fresh statistics if already running.
    pub fn start(self: &Arc<Self>, rate_hz: u32) -> SchedulerResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;

        self.arm(rate_hz)?;

        let period = Duration::from_micros(lock(&self.timing).interval_us);
        let weak: Weak<Self> = Arc::downgrade(self);
        let driver = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; ticks start one period after start
            interval.tick().await;
            loop {
                interval.tick().await;
                match weak.upgrade() {
                    Some(scheduler) => {
                        if scheduler.on_timer().is_none() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        });

        *lock(&self.driver) = Some(driver);
        Ok(())
    }

    /// Arm the scheduler without spawning a periodic driver.
    ///
    /// Ticks are then produced by calling [`on_timer`](Self::on_timer) directly,
    /// as replay and hardware-in-the-loop harnesses do.
    pub fn start_manual(&self, rate_hz: u32) -> SchedulerResult<()> {
        self.arm(rate_hz)
    }

    fn arm(&self, rate_hz: u32) -> SchedulerResult<()> {
        if rate_hz == 0 {
            return Err(SchedulerError::ZeroRate);
        }
        if rate_hz > 1000 {
            return Err(SchedulerError::RateTooHigh(rate_hz));
        }

        if self.is_running() {
            debug!("scheduler restart requested, stopping current driver");
            self.stop();
        }

        let interval_ms = 1000 / u64::from(rate_hz);
        {
            let mut timing = lock(&self.timing);
            *timing = TimingState {
                running: true,
                rate_hz,
                interval_us: interval_ms * 1_000,
                start_us: self.clock.elapsed_us(),
                last_tick_us: None,
                stats: SchedulerStats::default(),
            };
        }

        info!(rate_hz, interval_ms, "scheduler started");
        self.events.emit(&SchedulerEvent::Started { rate_hz });
        Ok(())
    }

    /// Halt ticking. No-op when not running.
    pub fn stop(&self) {
        {
            let mut timing = lock(&self.timing);
            if !timing.running {
                return;
            }
            timing.running = false;
        }

        if let Some(driver) = lock(&self.driver).take() {
            driver.abort();
        }

        let stats = self.stats();
        info!(
            ticks = stats.tick_count,
            missed = stats.missed_ticks,
            "scheduler stopped"
        );
        self.events.emit(&SchedulerEvent::Stopped);
    }

    /// Evaluate one timer expiry.
    ///
    /// Measures interval jitter against the expected period, counts missed
    /// periods, then runs every callback and records its execution time.
    /// Returns `None` when the scheduler is not running.
    pub fn on_timer(&self) -> Option<TickInfo> {
        let now_us = self.clock.elapsed_us();
        let mut pending = Vec::new();

        let tick = {
            let mut timing = lock(&self.timing);
            if !timing.running {
                return None;
            }

            if let Some(last_us) = timing.last_tick_us {
                let expected = timing.interval_us;
                let actual = now_us.saturating_sub(last_us);
                let jitter = actual.abs_diff(expected);

                // Starts from zero at `start`, no seeding
                timing.stats.avg_jitter_us = ema(timing.stats.avg_jitter_us, jitter as f64);

                if actual > expected * 2 {
                    let missed = actual / expected - 1;
                    timing.stats.missed_ticks += missed;
                    pending.push(SchedulerEvent::TickMissed { count: missed });
                }

                if jitter > self.jitter_threshold_us {
                    pending.push(SchedulerEvent::JitterExceeded { jitter_us: jitter });
                }
            }

            timing.last_tick_us = Some(now_us);
            timing.stats.tick_count += 1;

            TickInfo {
                tick_number: timing.stats.tick_count,
                elapsed_ms: now_us.saturating_sub(timing.start_us) / 1_000,
            }
        };

        for event in &pending {
            match event {
                SchedulerEvent::TickMissed { count } => {
                    warn!(tick = tick.tick_number, missed = count, "scheduler missed ticks")
                }
                SchedulerEvent::JitterExceeded { jitter_us } => {
                    warn!(tick = tick.tick_number, jitter_us, "scheduler jitter exceeded")
                }
                _ => {}
            }
        }
        self.events.emit_all(pending);

        let callbacks: Vec<TickCallback> = lock(&self.callbacks).iter().cloned().collect();
        let exec_start = self.clock.elapsed_us();
        for callback in callbacks {
            callback(tick);
        }
        let exec_us = self.clock.elapsed_us().saturating_sub(exec_start);

        {
            let mut timing = lock(&self.timing);
            let stats = &mut timing.stats;
            stats.avg_tick_duration_us = if stats.tick_count == 1 {
                exec_us as f64
            } else {
                ema(stats.avg_tick_duration_us, exec_us as f64)
            };
            stats.max_tick_duration_us = stats.max_tick_duration_us.max(exec_us);
        }

        Some(tick)
    }

    /// Whether the scheduler is currently armed
    pub fn is_running(&self) -> bool {
        lock(&self.timing).running
    }

    /// Configured rate, zero before the first start
    pub fn rate_hz(&self) -> u32 {
        lock(&self.timing).rate_hz
    }

    /// Expected tick interval in milliseconds
    pub fn interval_ms(&self) -> u64 {
        lock(&self.timing).interval_us / 1_000
    }

    /// Copy of the current timing statistics
    pub fn stats(&self) -> SchedulerStats {
        lock(&self.timing).stats
    }
}

impl Drop for DeterministicScheduler {
    fn drop(&mut self) {
        if let Some(driver) = lock(&self.driver).take() {
            driver.abort();
        }
    }
}

fn ema(average: f64, sample: f64) -> f64 {
    average * (1.0 - EMA_ALPHA) + sample * EMA_ALPHA
}
