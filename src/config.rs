//! System configuration parameters
//!
//! All tunable parameters for the fire-pump controller. Defaults match the
//! field installation; values can be overridden from NVS.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Longest alert address accepted (international MSISDN plus `+`).
pub const MAX_ADDRESS_LEN: usize = 20;

/// Raw-to-physical conversion constants for the analog inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorCalibration {
    /// Raw ADC count above which a pressure switch reads as closed.
    pub pressure_switch_threshold_raw: u16,
    /// Battery divider ratio (battery volts per ADC-pin volt).
    pub battery_divider_ratio: f32,
    /// ADC full-scale voltage in millivolts (12 dB attenuation).
    pub adc_reference_mv: u32,
}

impl Default for SensorCalibration {
    fn default() -> Self {
        Self {
            pressure_switch_threshold_raw: 3500,
            battery_divider_ratio: 5.7, // 47k / 10k
            adc_reference_mv: 3300,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Battery ---
    /// Below this the low-voltage alert latches (volts)
    pub low_voltage_threshold_v: f32,
    /// At or above this a latched alert clears (volts)
    pub normal_voltage_threshold_v: f32,

    // --- Start sequence ---
    /// How long the starter is engaged per attempt (seconds)
    pub crank_duration_secs: u16,
    /// Crank attempts before the start is declared failed
    pub max_start_attempts: u8,
    /// Window after releasing the starter to see pump pressure (seconds)
    pub pump_confirm_delay_secs: u16,

    // --- Maintenance ---
    /// Engine run time between service alerts (seconds)
    pub service_interval_secs: u64,

    // --- Reporting ---
    pub weekly_report_day: Weekday,
    /// Local hour (0-23) of the weekly report
    pub weekly_report_hour: u8,
    /// Where fault, battery, service and weekly messages go.
    /// Empty disables broadcast alerts.
    pub alert_address: String,

    // --- Hardware ---
    /// Poll the optional diesel tank level sensor
    pub tank_level_enabled: bool,
    pub calibration: SensorCalibration,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
    /// Modem poll interval for inbound SMS (milliseconds)
    pub sms_check_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Battery
            low_voltage_threshold_v: 11.5,
            normal_voltage_threshold_v: 12.5,

            // Start sequence
            crank_duration_secs: 5,
            max_start_attempts: 3,
            pump_confirm_delay_secs: 10,

            // Maintenance
            service_interval_secs: 18_000, // 5 h

            // Reporting
            weekly_report_day: Weekday::Mon,
            weekly_report_hour: 9,
            alert_address: String::new(),

            // Hardware
            tank_level_enabled: false,
            calibration: SensorCalibration::default(),

            // Timing
            control_loop_interval_ms: 1000, // 1 Hz
            sms_check_interval_ms: 5000,
        }
    }
}

impl SystemConfig {
    /// Range-check every field. Returns the first offending field.
    pub fn validate(&self) -> Result<(), &'static str> {
        let v_ok = |v: f32| v.is_finite() && (6.0..=32.0).contains(&v);
        if !v_ok(self.low_voltage_threshold_v) {
            return Err("low_voltage_threshold_v out of range (6-32 V)");
        }
        if !v_ok(self.normal_voltage_threshold_v) {
            return Err("normal_voltage_threshold_v out of range (6-32 V)");
        }
        if self.low_voltage_threshold_v >= self.normal_voltage_threshold_v {
            return Err("low_voltage_threshold_v must be below normal_voltage_threshold_v");
        }
        if !(1..=30).contains(&self.crank_duration_secs) {
            return Err("crank_duration_secs out of range (1-30)");
        }
        if !(1..=10).contains(&self.max_start_attempts) {
            return Err("max_start_attempts out of range (1-10)");
        }
        if !(1..=300).contains(&self.pump_confirm_delay_secs) {
            return Err("pump_confirm_delay_secs out of range (1-300)");
        }
        if self.service_interval_secs < 60 {
            return Err("service_interval_secs must be at least 60");
        }
        if self.weekly_report_hour > 23 {
            return Err("weekly_report_hour out of range (0-23)");
        }
        if self.alert_address.len() > MAX_ADDRESS_LEN {
            return Err("alert_address too long");
        }
        if !self
            .alert_address
            .chars()
            .enumerate()
            .all(|(i, c)| c.is_ascii_digit() || (i == 0 && c == '+'))
        {
            return Err("alert_address must be digits with optional leading '+'");
        }
        let cal = &self.calibration;
        if cal.pressure_switch_threshold_raw == 0 || cal.pressure_switch_threshold_raw >= 4095 {
            return Err("pressure_switch_threshold_raw out of range (1-4094)");
        }
        if !(cal.battery_divider_ratio.is_finite() && cal.battery_divider_ratio >= 1.0) {
            return Err("battery_divider_ratio must be >= 1.0");
        }
        if !(1000..=3900).contains(&cal.adc_reference_mv) {
            return Err("adc_reference_mv out of range (1000-3900)");
        }
        if !(100..=10_000).contains(&self.control_loop_interval_ms) {
            return Err("control_loop_interval_ms out of range (100-10000)");
        }
        if !(500..=600_000).contains(&self.sms_check_interval_ms) {
            return Err("sms_check_interval_ms out of range (500-600000)");
        }
        Ok(())
    }

    /// Crank time per attempt in milliseconds.
    pub fn crank_duration_ms(&self) -> u64 {
        u64::from(self.crank_duration_secs) * 1000
    }

    /// Pressure confirmation window in milliseconds.
    pub fn confirm_delay_ms(&self) -> u64 {
        u64::from(self.pump_confirm_delay_secs) * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.validate().is_ok());
        assert!(c.low_voltage_threshold_v < c.normal_voltage_threshold_v);
        assert_eq!(c.crank_duration_secs, 5);
        assert_eq!(c.max_start_attempts, 3);
        assert_eq!(c.pump_confirm_delay_secs, 10);
        assert_eq!(c.service_interval_secs, 18_000);
        assert_eq!(c.calibration.pressure_switch_threshold_raw, 3500);
    }

    #[test]
    fn serde_roundtrip() {
        let mut c = SystemConfig::default();
        c.alert_address = "+15551230000".into();
        c.weekly_report_day = Weekday::Sat;
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = SystemConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: SystemConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.max_start_attempts, c2.max_start_attempts);
        assert!((c.low_voltage_threshold_v - c2.low_voltage_threshold_v).abs() < 0.001);
    }

    #[test]
    fn inverted_voltage_thresholds_rejected() {
        let mut c = SystemConfig::default();
        c.low_voltage_threshold_v = 12.8;
        assert!(c.validate().is_err());
        c.low_voltage_threshold_v = 12.5;
        assert!(c.validate().is_err(), "equal thresholds leave no hysteresis band");
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut c = SystemConfig::default();
        c.max_start_attempts = 0;
        assert_eq!(c.validate(), Err("max_start_attempts out of range (1-10)"));
    }

    #[test]
    fn alert_address_format() {
        let mut c = SystemConfig::default();
        c.alert_address = "+447700900123".into();
        assert!(c.validate().is_ok());
        c.alert_address = "07700 900123".into();
        assert!(c.validate().is_err());
        c.alert_address = "12+34".into();
        assert!(c.validate().is_err());
        c.alert_address = "+123456789012345678901".into();
        assert!(c.validate().is_err());
    }

    #[test]
    fn report_hour_bounds() {
        let mut c = SystemConfig::default();
        c.weekly_report_hour = 23;
        assert!(c.validate().is_ok());
        c.weekly_report_hour = 24;
        assert!(c.validate().is_err());
    }

    #[test]
    fn nan_voltage_rejected() {
        let mut c = SystemConfig::default();
        c.normal_voltage_threshold_v = f32::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn durations_in_millis() {
        let c = SystemConfig::default();
        assert_eq!(c.crank_duration_ms(), 5_000);
        assert_eq!(c.confirm_delay_ms(), 10_000);
    }
}
