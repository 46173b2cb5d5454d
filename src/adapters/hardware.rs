//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and both relay drivers, exposing them through
//! [`SensorPort`] and [`ActuatorPort`]. This is the only module in the
//! system that touches actual hardware. On non-espidf targets the
//! underlying drivers use cfg-gated simulation stubs.

use embedded_hal::digital::OutputPin;
use log::error;

use crate::app::ports::{ActuatorPort, Output, SensorPort};
use crate::config::SystemConfig;
use crate::drivers::hw_init;
use crate::drivers::relay::{BoardPin, RelayDriver};
use crate::error::Result;
use crate::fsm::context::SensorSnapshot;
use crate::pins;
use crate::sensors::SensorHub;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<P: OutputPin> {
    sensor_hub: SensorHub,
    crank: RelayDriver<P>,
    fuel: RelayDriver<P>,
}

impl<P: OutputPin> HardwareAdapter<P> {
    pub fn new(sensor_hub: SensorHub, crank: RelayDriver<P>, fuel: RelayDriver<P>) -> Self {
        Self {
            sensor_hub,
            crank,
            fuel,
        }
    }

    fn relay(&mut self, output: Output) -> &mut RelayDriver<P> {
        match output {
            Output::Crank => &mut self.crank,
            Output::Fuel => &mut self.fuel,
        }
    }

    fn drive(&mut self, output: Output, on: bool) {
        let relay = self.relay(output);
        if let Err(e) = relay.set(on) {
            // The next tick re-asserts the same level.
            error!("{:?} relay write failed: {}", output, e);
        }
    }
}

impl HardwareAdapter<BoardPin> {
    /// Initialise the ADC and relay GPIOs and wire the board's channels.
    ///
    /// Both relays are released before this returns.
    pub fn board() -> Result<Self> {
        hw_init::init_peripherals()?;
        Ok(Self::new(
            SensorHub::new(),
            RelayDriver::new(BoardPin::new(pins::CRANK_RELAY_GPIO), "crank")?,
            RelayDriver::new(BoardPin::new(pins::FUEL_RELAY_GPIO), "fuel")?,
        ))
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<P: OutputPin> SensorPort for HardwareAdapter<P> {
    fn read_all(&mut self, config: &SystemConfig) -> SensorSnapshot {
        self.sensor_hub.read_all(config)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<P: OutputPin> ActuatorPort for HardwareAdapter<P> {
    fn assert_output(&mut self, output: Output) {
        self.drive(output, true);
    }

    fn deassert_output(&mut self, output: Output) {
        self.drive(output, false);
    }

    fn is_asserted(&self, output: Output) -> bool {
        match output {
            Output::Crank => self.crank.is_energised(),
            Output::Fuel => self.fuel.is_energised(),
        }
    }
}
