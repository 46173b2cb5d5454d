//! Diesel tank level sender (optional fitment).
//!
//! Reported raw; operators read it against the tank's own calibration card.

use log::warn;

use crate::drivers::hw_init;

pub struct TankLevelSensor {
    channel: u32,
    last_raw: Option<u16>,
}

impl TankLevelSensor {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            last_raw: None,
        }
    }

    /// Latest raw level. `None` until the first good read.
    pub fn read(&mut self) -> Option<u16> {
        match hw_init::adc1_read(self.channel) {
            Ok(raw) => self.last_raw = Some(raw),
            Err(e) => warn!("Tank level read failed: {e}"),
        }
        self.last_raw
    }
}
