//! FSM context: the shared "blackboard" passed to every state handler.
//!
//! Contains the latest sensor snapshot, the requested engine outputs,
//! the start sequencer, configuration and a small queue of notices the
//! handlers raise for [`PumpService`](crate::app::service::PumpService)
//! to act on (session start, requester replies, alerts).

use log::warn;

use super::sequencer::StartSequencer;
use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Sensor snapshot (read-only for state handlers)
// ---------------------------------------------------------------------------

/// Latest sensor readings, refreshed once per control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    /// Starting battery voltage (volts), `None` until the first good read.
    pub battery_voltage_v: Option<f32>,
    /// Pump discharge pressure switch closed.
    pub pump_pressure: bool,
    /// Engine oil pressure switch closed.
    pub oil_pressure: bool,
    /// Raw diesel tank level, `None` when the sensor is disabled.
    pub tank_level_raw: Option<u16>,
    /// Modem signal quality (AT+CSQ RSSI, 99 = unknown).
    pub signal_strength: i32,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            battery_voltage_v: None,
            pump_pressure: false,
            oil_pressure: false,
            tank_level_raw: None,
            signal_strength: 99,
        }
    }
}

// ---------------------------------------------------------------------------
// Output commands (written by state handlers)
// ---------------------------------------------------------------------------

/// Requested state of the two engine outputs.
///
/// State handlers write here; the service applies them to the
/// [`ActuatorPort`](crate::app::ports::ActuatorPort) after the fail-safe
/// check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputCommands {
    pub crank: bool,
    pub fuel: bool,
}

impl OutputCommands {
    /// Both outputs released.
    pub const fn all_off() -> Self {
        Self {
            crank: false,
            fuel: false,
        }
    }

    pub fn any_on(&self) -> bool {
        self.crank || self.fuel
    }
}

// ---------------------------------------------------------------------------
// Notices (handlers → service)
// ---------------------------------------------------------------------------

/// Something a state handler wants the service to act on after the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpNotice {
    /// Starter engaged for the given attempt.
    CrankAttempt(u8),
    /// Pump pressure confirmed on the given attempt.
    Confirmed(u8),
    /// All attempts used without pump pressure.
    Exhausted(u8),
}

/// Notices raised within one tick. Handlers raise at most two.
pub const NOTICE_CAPACITY: usize = 4;

// ---------------------------------------------------------------------------
// FSM context
// ---------------------------------------------------------------------------

/// Mutable context threaded through every FSM handler.
pub struct PumpContext {
    /// Monotonic time of the current tick (ms since boot).
    pub now_ms: u64,

    // -- Timing (maintained by the engine) --
    pub ticks_in_state: u64,
    pub total_ticks: u64,

    // -- Data --
    pub sensors: SensorSnapshot,
    pub outputs: OutputCommands,
    pub sequencer: StartSequencer,
    pub config: SystemConfig,

    /// Pending notices, drained by the service after each tick.
    pub notices: heapless::Vec<PumpNotice, NOTICE_CAPACITY>,
}

impl PumpContext {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            now_ms: 0,
            ticks_in_state: 0,
            total_ticks: 0,
            sensors: SensorSnapshot::default(),
            outputs: OutputCommands::all_off(),
            sequencer: StartSequencer::new(),
            config,
            notices: heapless::Vec::new(),
        }
    }

    /// Queue a notice for the service.
    pub fn notify(&mut self, notice: PumpNotice) {
        if self.notices.push(notice).is_err() {
            warn!("Notice queue full, dropped {:?}", notice);
        }
    }

    /// Take every queued notice, leaving the queue empty.
    pub fn take_notices(&mut self) -> heapless::Vec<PumpNotice, NOTICE_CAPACITY> {
        core::mem::take(&mut self.notices)
    }
}
