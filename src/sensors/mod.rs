//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns every sensor driver and produces a [`SensorSnapshot`] each
//! tick that gets written into `PumpContext.sensors`.

pub mod battery;
pub mod pressure_switch;
pub mod tank_level;

use core::sync::atomic::{AtomicI32, Ordering};

use crate::config::SystemConfig;
use crate::fsm::context::SensorSnapshot;
use crate::pins;
use battery::BatterySensor;
use pressure_switch::PressureSwitch;
use tank_level::TankLevelSensor;

/// Last modem signal quality (AT+CSQ RSSI), written by the modem poll.
/// 99 = unknown / not detectable.
static SIGNAL_STRENGTH: AtomicI32 = AtomicI32::new(99);

/// Publish a new signal-quality reading. Lock-free.
pub fn set_signal_strength(rssi: i32) {
    SIGNAL_STRENGTH.store(rssi, Ordering::Release);
}

pub fn signal_strength() -> i32 {
    SIGNAL_STRENGTH.load(Ordering::Acquire)
}

/// Aggregates all sensor drivers and produces a unified snapshot.
pub struct SensorHub {
    pub battery: BatterySensor,
    pub pump_pressure: PressureSwitch,
    pub oil_pressure: PressureSwitch,
    pub tank_level: TankLevelSensor,
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorHub {
    /// Hub wired to the board's ADC channels.
    pub fn new() -> Self {
        Self::with_channels(
            pins::BATTERY_ADC_CHANNEL,
            pins::PUMP_PRESSURE_ADC_CHANNEL,
            pins::OIL_PRESSURE_ADC_CHANNEL,
            pins::TANK_LEVEL_ADC_CHANNEL,
        )
    }

    pub fn with_channels(battery: u32, pump_pressure: u32, oil_pressure: u32, tank: u32) -> Self {
        Self {
            battery: BatterySensor::new(battery),
            pump_pressure: PressureSwitch::new(pump_pressure, "pump"),
            oil_pressure: PressureSwitch::new(oil_pressure, "oil"),
            tank_level: TankLevelSensor::new(tank),
        }
    }

    /// Read every sensor and return a unified snapshot.
    ///
    /// Individual read failures are logged by the drivers and the previous
    /// good value is retained; a single flaky input must not stall the loop.
    pub fn read_all(&mut self, config: &SystemConfig) -> SensorSnapshot {
        let cal = &config.calibration;
        SensorSnapshot {
            battery_voltage_v: self.battery.read(cal),
            pump_pressure: self.pump_pressure.read(cal.pressure_switch_threshold_raw),
            oil_pressure: self.oil_pressure.read(cal.pressure_switch_threshold_raw),
            tank_level_raw: if config.tank_level_enabled {
                self.tank_level.read()
            } else {
                None
            },
            signal_strength: signal_strength(),
        }
    }
}
