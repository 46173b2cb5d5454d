//! Pressure switches (pump discharge, engine oil).
//!
//! Each switch pulls its ADC input towards 3V3 when closed. The input is
//! sampled on ADC1 rather than as a digital pin so long cable runs with
//! leakage still resolve cleanly against a configurable threshold.

use log::warn;

use crate::drivers::hw_init;

/// A switch reads closed when the raw count is strictly above `threshold`.
pub fn is_closed(raw: u16, threshold: u16) -> bool {
    raw > threshold
}

pub struct PressureSwitch {
    channel: u32,
    label: &'static str,
    last_closed: bool,
}

impl PressureSwitch {
    pub fn new(channel: u32, label: &'static str) -> Self {
        Self {
            channel,
            label,
            last_closed: false,
        }
    }

    /// Sample the switch. A failed read keeps the previous state.
    pub fn read(&mut self, threshold: u16) -> bool {
        match hw_init::adc1_read(self.channel) {
            Ok(raw) => self.last_closed = is_closed(raw, threshold),
            Err(e) => warn!(
                "{} pressure read failed ({e}), holding {}",
                self.label, self.last_closed
            ),
        }
        self.last_closed
    }
}
