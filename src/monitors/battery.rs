//! Starting-battery voltage monitor.
//!
//! Two thresholds with a dead band between them:
//! - below **low** while clear → latch, raise [`VoltageAlert::Low`]
//! - at or above **normal** while latched → clear, raise [`VoltageAlert::Recovered`]
//!
//! Readings inside the band never change the latch, so a battery hovering
//! around one threshold produces a single alert.

use crate::config::SystemConfig;

/// Edge produced by [`VoltageMonitor::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoltageAlert {
    Low { volts: f32 },
    Recovered { volts: f32 },
}

impl VoltageAlert {
    /// Operator-facing SMS text.
    pub fn message(&self) -> String {
        match self {
            Self::Low { volts } => format!("ALERT: Fire pump battery LOW {:.1}V", volts),
            Self::Recovered { volts } => {
                format!("Fire pump battery recovered {:.1}V", volts)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoltageMonitor {
    low_threshold_v: f32,
    normal_threshold_v: f32,
    latched: bool,
}

impl VoltageMonitor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            low_threshold_v: config.low_voltage_threshold_v,
            normal_threshold_v: config.normal_voltage_threshold_v,
            latched: false,
        }
    }

    /// Feed one reading. Returns an alert only on a latch edge.
    pub fn evaluate(&mut self, volts: f32) -> Option<VoltageAlert> {
        if !self.latched && volts < self.low_threshold_v {
            self.latched = true;
            return Some(VoltageAlert::Low { volts });
        }
        if self.latched && volts >= self.normal_threshold_v {
            self.latched = false;
            return Some(VoltageAlert::Recovered { volts });
        }
        None
    }

    /// Whether the low-voltage alert is currently latched.
    pub fn is_low(&self) -> bool {
        self.latched
    }
}
