//! Vehicle signal catalog
//!
//! Well-known signal identifiers and the factory definitions used to populate
//! the hub for an instrument cluster.

use crate::definition::SignalDefinition;
use crate::error::SignalResult;
use crate::hub::SignalHub;

/// Standard signal identifiers.
pub mod signal_ids {
    // Motion
    pub const VEHICLE_SPEED: &str = "vehicle.speed";
    pub const ENGINE_RPM: &str = "engine.rpm";
    pub const ODOMETER: &str = "vehicle.odometer";

    // Powertrain
    pub const GEAR_POSITION: &str = "powertrain.gear";

    // Energy
    pub const BATTERY_SOC: &str = "energy.battery_soc";
    pub const BATTERY_RANGE: &str = "energy.battery_range";
    pub const POWER_CONSUMPTION: &str = "energy.power_consumption";

    // Telltales
    pub const TELLTALE_TURN_LEFT: &str = "telltale.turn_left";
    pub const TELLTALE_TURN_RIGHT: &str = "telltale.turn_right";
    pub const TELLTALE_HAZARD: &str = "telltale.hazard";
    pub const TELLTALE_HIGH_BEAM: &str = "telltale.high_beam";
    pub const TELLTALE_LOW_BEAM: &str = "telltale.low_beam";
    pub const TELLTALE_SEATBELT: &str = "telltale.seatbelt";
    pub const TELLTALE_DOOR_OPEN: &str = "telltale.door_open";
    pub const TELLTALE_ENGINE_CHECK: &str = "telltale.engine_check";
    pub const TELLTALE_ABS: &str = "telltale.abs";
    pub const TELLTALE_AIRBAG: &str = "telltale.airbag";
    pub const TELLTALE_TIRE_PRESSURE: &str = "telltale.tire_pressure";
    pub const TELLTALE_BATTERY: &str = "telltale.battery_warning";
    pub const TELLTALE_TEMP: &str = "telltale.temperature";

    // ADAS
    pub const ADAS_ENABLED: &str = "adas.enabled";
    pub const ADAS_ACTIVE: &str = "adas.active";

    // Environment
    pub const OUTSIDE_TEMP: &str = "environment.outside_temp";
}

use signal_ids::*;

/// Vehicle speed: 0..400 km/h, 300ms freshness, 50 km/h per second plausibility limit
pub fn speed_signal(safety_critical: bool) -> SignalDefinition {
    SignalDefinition::new(VEHICLE_SPEED, 0.0)
        .name("Vehicle Speed")
        .unit("km/h")
        .range(0.0, 400.0)
        .freshness_ms(300)
        .max_rate(50.0)
        .safety_critical(safety_critical)
}

/// Engine speed with a configurable redline
pub fn rpm_signal(max_rpm: f64) -> SignalDefinition {
    SignalDefinition::new(ENGINE_RPM, 0.0)
        .name("Engine RPM")
        .unit("rpm")
        .range(0.0, max_rpm)
        .freshness_ms(200)
        .max_rate(5_000.0)
}

pub fn gear_signal() -> SignalDefinition {
    SignalDefinition::new(GEAR_POSITION, "P")
        .name("Gear Position")
        .freshness_ms(500)
        .safety_critical(true)
}

pub fn battery_soc_signal() -> SignalDefinition {
    SignalDefinition::new(BATTERY_SOC, 0.0)
        .name("Battery State of Charge")
        .unit("%")
        .range(0.0, 100.0)
        .freshness_ms(5_000)
}

/// Boolean telltale. Critical telltales age out twice as fast.
pub fn telltale_signal(id: &str, name: &str, safety_critical: bool) -> SignalDefinition {
    SignalDefinition::new(id, false)
        .name(name)
        .freshness_ms(if safety_critical { 500 } else { 1_000 })
        .safety_critical(safety_critical)
}

/// Full cluster signal set.
pub fn cluster_signal_definitions(max_rpm: f64) -> Vec<SignalDefinition> {
    let mut defs = vec![
        speed_signal(true),
        rpm_signal(max_rpm),
        SignalDefinition::new(ODOMETER, 0.0)
            .name("Odometer")
            .unit("km")
            .range(0.0, 9_999_999.0)
            .freshness_ms(1_000),
        gear_signal(),
        battery_soc_signal(),
        SignalDefinition::new(BATTERY_RANGE, 0.0)
            .name("Battery Range")
            .unit("km")
            .range(0.0, 1_000.0)
            .freshness_ms(5_000),
        // Negative values are regeneration
        SignalDefinition::new(POWER_CONSUMPTION, 0.0)
            .name("Power Consumption")
            .unit("kW")
            .range(-200.0, 500.0)
            .freshness_ms(500),
    ];

    let telltales: [(&str, &str, bool); 13] = [
        (TELLTALE_TURN_LEFT, "Turn Left", false),
        (TELLTALE_TURN_RIGHT, "Turn Right", false),
        (TELLTALE_HAZARD, "Hazard", true),
        (TELLTALE_HIGH_BEAM, "High Beam", false),
        (TELLTALE_LOW_BEAM, "Low Beam", false),
        (TELLTALE_SEATBELT, "Seatbelt", true),
        (TELLTALE_DOOR_OPEN, "Door Open", true),
        (TELLTALE_ENGINE_CHECK, "Engine Check", true),
        (TELLTALE_ABS, "ABS", true),
        (TELLTALE_AIRBAG, "Airbag", true),
        (TELLTALE_TIRE_PRESSURE, "Tire Pressure", true),
        (TELLTALE_BATTERY, "Battery Warning", true),
        (TELLTALE_TEMP, "Temperature Warning", true),
    ];
    defs.extend(
        telltales
            .iter()
            .map(|(id, name, critical)| telltale_signal(id, name, *critical)),
    );

    defs.push(
        SignalDefinition::new(ADAS_ENABLED, false)
            .name("ADAS Enabled")
            .freshness_ms(500)
            .safety_critical(true),
    );
    defs.push(
        SignalDefinition::new(ADAS_ACTIVE, false)
            .name("ADAS Active")
            .freshness_ms(200)
            .safety_critical(true),
    );
    defs.push(
        SignalDefinition::new(OUTSIDE_TEMP, 20.0)
            .name("Outside Temperature")
            .unit("C")
            .range(-50.0, 70.0)
            .freshness_ms(10_000),
    );

    defs
}

/// Register the cluster signal set on a hub.
pub fn register_cluster_signals(hub: &SignalHub, max_rpm: f64) -> SignalResult<()> {
    for def in cluster_signal_definitions(max_rpm) {
        hub.register_signal(def)?;
    }
    Ok(())
}
