//! Operator-facing report text.

use core::fmt;

use crate::fsm::PumpState;

/// Seconds as hours with one decimal place, e.g. `18180` → `"5.1"`.
pub fn format_hours(secs: u64) -> String {
    format!("{:.1}", secs as f64 / 3600.0)
}

/// Everything the `status` reply and the weekly report show.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub state: PumpState,
    /// `(attempt, max)` while starting.
    pub start_attempt: Option<(u8, u8)>,
    /// `None` until the battery sense has produced a reading.
    pub battery_voltage_v: Option<f32>,
    pub battery_low: bool,
    pub pump_pressure: bool,
    pub oil_pressure: bool,
    pub tank_level_raw: Option<u16>,
    pub signal_strength: i32,
    pub run_secs: u64,
    pub secs_until_service: u64,
}

fn yes_no(v: bool) -> &'static str {
    if v { "YES" } else { "NO" }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FIRE PUMP: {}", self.state.label())?;
        if let Some((attempt, max)) = self.start_attempt {
            write!(f, " (attempt {attempt}/{max})")?;
        }
        match self.battery_voltage_v {
            Some(v) => write!(f, "\nBatt: {v:.1}V")?,
            None => f.write_str("\nBatt: --")?,
        }
        if self.battery_low {
            f.write_str(" LOW")?;
        }
        write!(
            f,
            "\nPump pressure: {}\nOil pressure: {}",
            yes_no(self.pump_pressure),
            yes_no(self.oil_pressure)
        )?;
        if let Some(tank) = self.tank_level_raw {
            write!(f, "\nTank: {tank}")?;
        }
        write!(
            f,
            "\nSignal: {}\nRun hours: {}\nService in: {}h",
            self.signal_strength,
            format_hours(self.run_secs),
            format_hours(self.secs_until_service)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> StatusReport {
        StatusReport {
            state: PumpState::Idle,
            start_attempt: None,
            battery_voltage_v: Some(12.64),
            battery_low: false,
            pump_pressure: false,
            oil_pressure: false,
            tank_level_raw: None,
            signal_strength: 18,
            run_secs: 44_280,
            secs_until_service: 9_720,
        }
    }

    #[test]
    fn hours_have_one_decimal() {
        assert_eq!(format_hours(0), "0.0");
        assert_eq!(format_hours(18_005), "5.0");
        assert_eq!(format_hours(18_180), "5.1");
        assert_eq!(format_hours(3_600 * 1000), "1000.0");
    }

    #[test]
    fn idle_report_layout() {
        assert_eq!(
            report().to_string(),
            "FIRE PUMP: IDLE\nBatt: 12.6V\nPump pressure: NO\nOil pressure: NO\n\
             Signal: 18\nRun hours: 12.3\nService in: 2.7h"
        );
    }

    #[test]
    fn starting_report_shows_attempt_tank_and_low_battery() {
        let r = StatusReport {
            state: PumpState::Starting,
            start_attempt: Some((2, 3)),
            battery_voltage_v: Some(11.2),
            battery_low: true,
            tank_level_raw: Some(2048),
            ..report()
        };
        let text = r.to_string();
        assert!(text.starts_with("FIRE PUMP: STARTING (attempt 2/3)\nBatt: 11.2V LOW"));
        assert!(text.contains("\nTank: 2048\n"));
    }
}
