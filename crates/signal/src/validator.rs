//! Stateless signal validation helpers.
//!
//! Used by producers and the runtime's input path to sanity-check values
//! before they reach the hub. A passing result may still carry a corrected
//! value that should be forwarded instead of the original.

use crate::definition::SignalData;
use serde::{Deserialize, Serialize};

/// Maximum plausible speed in km/h
pub const MAX_SPEED_KMH: f64 = 400.0;

/// Maximum plausible speed in mph
pub const MAX_SPEED_MPH: f64 = 250.0;

/// Default plausible temperature band (°C)
pub const MIN_TEMPERATURE_C: f64 = -50.0;
pub const MAX_TEMPERATURE_C: f64 = 150.0;

const VALID_GEARS: [&str; 17] = [
    "P", "R", "N", "D", "L", "S", "1", "2", "3", "4", "5", "6", "7", "8", "9", "M", "B",
];

/// Outcome of a validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    /// Replacement value to use instead of the input
    pub corrected_value: Option<SignalData>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl ValidationResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            corrected_value: None,
            error_code: None,
            error_message: None,
        }
    }

    pub fn corrected(value: impl Into<SignalData>) -> Self {
        Self {
            corrected_value: Some(value.into()),
            ..Self::pass()
        }
    }

    pub fn fail(code: &str, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            corrected_value: None,
            error_code: Some(code.to_string()),
            error_message: Some(message.into()),
        }
    }
}

/// A reusable validation rule.
pub type ValidationRule = Box<dyn Fn(&SignalData) -> ValidationResult + Send + Sync>;

/// Range rule: clamps into `[min, max]` when `clamp` is set, otherwise fails.
pub fn range_rule(min: f64, max: f64, clamp: bool) -> ValidationRule {
    Box::new(move |value| {
        let Some(n) = value.as_f64() else {
            return ValidationResult::fail("RANGE_INVALID_TYPE", "Value is not numeric");
        };
        if n < min || n > max {
            if clamp {
                ValidationResult::corrected(n.clamp(min, max))
            } else {
                ValidationResult::fail(
                    "RANGE_EXCEEDED",
                    format!("Value {} outside range [{}, {}]", n, min, max),
                )
            }
        } else {
            ValidationResult::pass()
        }
    })
}

/// Discrete rule: value must equal one of `allowed`.
pub fn discrete_rule(allowed: Vec<SignalData>) -> ValidationRule {
    Box::new(move |value| {
        if allowed.iter().any(|a| a == value) {
            ValidationResult::pass()
        } else {
            ValidationResult::fail("DISCRETE_INVALID", "Value not in allowed set")
        }
    })
}

/// Apply rules in order, feeding corrected values forward.
///
/// Stops at the first failure. A passing chain reports the final
/// correction, if any rule produced one.
pub fn validate_all(value: &SignalData, rules: &[ValidationRule]) -> ValidationResult {
    let mut current = value.clone();
    let mut corrected = false;
    for rule in rules {
        let result = rule(&current);
        if !result.passed {
            return result;
        }
        if let Some(next) = result.corrected_value {
            current = next;
            corrected = true;
        }
    }
    if corrected {
        ValidationResult::corrected(current)
    } else {
        ValidationResult::pass()
    }
}

pub fn validate_rate_of_change(
    current: f64,
    previous: f64,
    max_rate_per_second: f64,
    delta_time_ms: u64,
) -> ValidationResult {
    if delta_time_ms == 0 {
        return ValidationResult::pass();
    }
    let rate = (current - previous).abs() * 1000.0 / delta_time_ms as f64;
    if rate > max_rate_per_second {
        ValidationResult::fail(
            "RATE_EXCEEDED",
            format!(
                "Rate of change {}/s exceeds maximum {}/s",
                rate, max_rate_per_second
            ),
        )
    } else {
        ValidationResult::pass()
    }
}

/// Speed sanity: negatives become 0, values above the unit's ceiling are capped.
pub fn validate_speed(speed: f64, is_kmh: bool) -> ValidationResult {
    let max_speed = if is_kmh { MAX_SPEED_KMH } else { MAX_SPEED_MPH };
    if speed < 0.0 {
        ValidationResult::corrected(0.0)
    } else if speed > max_speed {
        ValidationResult::corrected(max_speed)
    } else {
        ValidationResult::pass()
    }
}

pub fn validate_percentage(percent: f64) -> ValidationResult {
    if (0.0..=100.0).contains(&percent) {
        ValidationResult::pass()
    } else {
        ValidationResult::corrected(percent.clamp(0.0, 100.0))
    }
}

pub fn validate_temperature(temp_celsius: f64, min: f64, max: f64) -> ValidationResult {
    if temp_celsius < min || temp_celsius > max {
        ValidationResult::fail(
            "TEMP_RANGE_EXCEEDED",
            format!("Temperature {}C outside range [{}, {}]", temp_celsius, min, max),
        )
    } else {
        ValidationResult::pass()
    }
}

/// Gear letters and numbers, case-insensitive.
pub fn validate_gear(gear: &str) -> ValidationResult {
    let upper = gear.to_ascii_uppercase();
    if VALID_GEARS.contains(&upper.as_str()) {
        ValidationResult::pass()
    } else {
        ValidationResult::fail("GEAR_INVALID", format!("Invalid gear position: {}", gear))
    }
}
