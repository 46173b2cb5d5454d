//! Output fail-safe.
//!
//! Runs **every tick after the FSM** and before outputs reach the relays.
//! Whatever the handlers or a command path left in
//! [`OutputCommands`], the guard enforces the per-state output rules:
//!
//! | state    | crank          | fuel |
//! |----------|----------------|------|
//! | Idle     | off            | off  |
//! | Failed   | off            | off  |
//! | Starting | sequencer only | on   |
//! | Running  | off            | on   |
//!
//! A correction means a handler bug; it is logged loudly and counted, and
//! the outputs are forced to the safe value for that tick. The service
//! then re-asserts every output every tick, so a relay that was glitched
//! externally is also brought back in line.

use crate::fsm::PumpState;
use crate::fsm::context::OutputCommands;
use crate::fsm::sequencer::StartSequencer;
use log::error;

/// Output fail-safe guard.
#[derive(Debug, Default)]
pub struct FailSafeGuard {
    corrections: u32,
}

impl FailSafeGuard {
    pub fn new() -> Self {
        Self { corrections: 0 }
    }

    /// Force `outputs` into the allowed set for `state`.
    /// Returns `true` if anything had to be changed.
    pub fn enforce(
        &mut self,
        state: PumpState,
        sequencer: &StartSequencer,
        outputs: &mut OutputCommands,
    ) -> bool {
        let allowed = Self::allowed(state, sequencer);
        let corrected = OutputCommands {
            crank: outputs.crank && allowed.crank,
            fuel: match state {
                PumpState::Starting | PumpState::Running => true,
                PumpState::Idle | PumpState::Failed => false,
            },
        };
        if corrected == *outputs {
            return false;
        }
        self.corrections = self.corrections.saturating_add(1);
        error!(
            "FAIL-SAFE: outputs {:?} not allowed in {:?}, forcing {:?}",
            outputs, state, corrected
        );
        *outputs = corrected;
        true
    }

    /// How many ticks needed a correction since boot.
    pub fn corrections(&self) -> u32 {
        self.corrections
    }

    fn allowed(state: PumpState, sequencer: &StartSequencer) -> OutputCommands {
        match state {
            PumpState::Idle | PumpState::Failed => OutputCommands::all_off(),
            PumpState::Starting => OutputCommands {
                crank: sequencer.is_cranking(),
                fuel: true,
            },
            PumpState::Running => OutputCommands {
                crank: false,
                fuel: true,
            },
        }
    }
}
