//! Starting-battery voltage sense.
//!
//! The 12 V battery feeds ADC1 through a resistive divider. Conversion:
//!
//! ```text
//!   pin_mv  = raw * adc_reference_mv / 4095
//!   battery = pin_mv / 1000 * battery_divider_ratio
//! ```
//!
//! A failed read keeps the previous good value. Before the first good
//! read there is no value at all.

use log::warn;

use crate::config::SensorCalibration;
use crate::drivers::hw_init;
use crate::pins;

/// Convert a raw ADC count to battery volts.
pub fn raw_to_volts(raw: u16, cal: &SensorCalibration) -> f32 {
    let pin_mv = f32::from(raw) * cal.adc_reference_mv as f32 / f32::from(pins::ADC_MAX_RAW);
    pin_mv / 1000.0 * cal.battery_divider_ratio
}

pub struct BatterySensor {
    channel: u32,
    last_volts: Option<f32>,
}

impl BatterySensor {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            last_volts: None,
        }
    }

    pub fn read(&mut self, cal: &SensorCalibration) -> Option<f32> {
        match hw_init::adc1_read(self.channel) {
            Ok(raw) => self.last_volts = Some(raw_to_volts(raw, cal)),
            Err(e) => match self.last_volts {
                Some(v) => warn!("Battery read failed ({e}), holding {v:.2}V"),
                None => warn!("Battery read failed ({e}), no reading yet"),
            },
        }
        self.last_volts
    }

    pub fn last_volts(&self) -> Option<f32> {
        self.last_volts
    }
}
