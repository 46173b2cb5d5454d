//! Active-low relay driver (crank relay, fuel solenoid relay).
//!
//! Generic over an `embedded-hal` [`OutputPin`] so the same driver runs on
//! the board ([`BoardPin`]) and against a recording pin in host tests.
//!
//! ## Safety contract
//!
//! The relay boots released. Whether it may be energised is decided by the
//! state machine and the fail-safe; this driver is a dumb actuator.

use embedded_hal::digital::{ErrorType, OutputPin};
use log::error;

use crate::drivers::hw_init;
use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Released,
    Energised,
}

pub struct RelayDriver<P: OutputPin> {
    pin: P,
    label: &'static str,
    state: RelayState,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Take ownership of `pin` and drive it to the released level.
    pub fn new(pin: P, label: &'static str) -> Result<Self, ActuatorError> {
        let mut relay = Self {
            pin,
            label,
            state: RelayState::Released,
        };
        relay.release()?;
        Ok(relay)
    }

    /// Close the relay contacts (pin LOW).
    pub fn energise(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_low().map_err(|_| {
            error!("Relay {}: energise failed", self.label);
            ActuatorError::GpioWriteFailed
        })?;
        self.state = RelayState::Energised;
        Ok(())
    }

    /// Open the relay contacts (pin HIGH).
    pub fn release(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_high().map_err(|_| {
            error!("Relay {}: release failed", self.label);
            ActuatorError::GpioWriteFailed
        })?;
        self.state = RelayState::Released;
        Ok(())
    }

    pub fn set(&mut self, energised: bool) -> Result<(), ActuatorError> {
        if energised {
            self.energise()
        } else {
            self.release()
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn is_energised(&self) -> bool {
        self.state == RelayState::Energised
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

// ── Board pin ─────────────────────────────────────────────────

/// A relay GPIO configured by [`hw_init::init_peripherals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardPin {
    gpio: i32,
}

impl BoardPin {
    pub const fn new(gpio: i32) -> Self {
        Self { gpio }
    }
}

/// Raw `esp_err_t` from a failed GPIO write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinError(pub i32);

impl embedded_hal::digital::Error for PinError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl ErrorType for BoardPin {
    type Error = PinError;
}

impl OutputPin for BoardPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.gpio, false).map_err(PinError)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.gpio, true).map_err(PinError)
    }
}
