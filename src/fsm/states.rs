//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  IDLE ──[start]──▶ STARTING ──[pump pressure]──▶ RUNNING
//!   ▲                  │   ▲                           │
//!   │    [attempts exhausted]  [start]                 │
//!   │                  ▼   │                           │
//!   ├──[reset / stop]── FAILED                         │
//!   └────────────────────────────────[stop]────────────┘
//! ```
//!
//! Only the sequencer drives transitions from inside a tick
//! (`Starting` → `Running` / `Failed`). Every other edge is a command,
//! applied by the service through [`Fsm::force_transition`](super::Fsm::force_transition).

use super::context::{OutputCommands, PumpContext, PumpNotice};
use super::sequencer::{SequencerStep, SequencerTiming};
use super::{PumpState, StateDescriptor};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table. Called once at startup.
pub fn build_state_table() -> [StateDescriptor; PumpState::COUNT] {
    [
        // 0: Idle
        StateDescriptor {
            id: PumpState::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: hold,
        },
        // 1: Starting
        StateDescriptor {
            id: PumpState::Starting,
            name: "Starting",
            on_enter: Some(starting_enter),
            on_exit: Some(starting_exit),
            on_update: starting_update,
        },
        // 2: Running
        StateDescriptor {
            id: PumpState::Running,
            name: "Running",
            on_enter: Some(running_enter),
            on_exit: None,
            on_update: hold,
        },
        // 3: Failed
        StateDescriptor {
            id: PumpState::Failed,
            name: "Failed",
            on_enter: Some(failed_enter),
            on_exit: None,
            on_update: hold,
        },
    ]
}

/// Shared update for states that only leave on a command.
fn hold(_ctx: &mut PumpContext) -> Option<PumpState> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut PumpContext) {
    ctx.outputs = OutputCommands::all_off();
    ctx.sequencer.clear();
    info!("IDLE: engine off, awaiting start command");
}

// ═══════════════════════════════════════════════════════════════════════════
//  STARTING state
// ═══════════════════════════════════════════════════════════════════════════

fn starting_enter(ctx: &mut PumpContext) {
    ctx.sequencer.begin(ctx.now_ms);
    ctx.outputs = OutputCommands {
        crank: true,
        fuel: true,
    };
    info!(
        "STARTING: fuel on, cranking attempt 1/{} for {}s",
        ctx.config.max_start_attempts, ctx.config.crank_duration_secs
    );
    ctx.notify(PumpNotice::CrankAttempt(1));
}

fn starting_exit(ctx: &mut PumpContext) {
    ctx.outputs.crank = false;
    ctx.sequencer.finish();
}

fn starting_update(ctx: &mut PumpContext) -> Option<PumpState> {
    let timing = SequencerTiming::from_config(&ctx.config);
    match ctx
        .sequencer
        .advance(ctx.now_ms, ctx.sensors.pump_pressure, &timing)
    {
        SequencerStep::Holding => None,
        SequencerStep::CrankReleased => {
            ctx.outputs.crank = false;
            info!(
                "STARTING: crank released, waiting {}s for pump pressure",
                ctx.config.pump_confirm_delay_secs
            );
            None
        }
        SequencerStep::Retry(attempt) => {
            ctx.outputs.crank = true;
            ctx.outputs.fuel = true;
            warn!(
                "STARTING: no pump pressure, cranking attempt {}/{}",
                attempt, timing.max_attempts
            );
            ctx.notify(PumpNotice::CrankAttempt(attempt));
            None
        }
        SequencerStep::Confirmed(attempt) => {
            info!("STARTING: pump pressure confirmed on attempt {}", attempt);
            ctx.notify(PumpNotice::Confirmed(attempt));
            Some(PumpState::Running)
        }
        SequencerStep::Exhausted(attempt) => {
            warn!("STARTING: no pump pressure after {} attempts", attempt);
            ctx.notify(PumpNotice::Exhausted(attempt));
            Some(PumpState::Failed)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING state
// ═══════════════════════════════════════════════════════════════════════════

fn running_enter(ctx: &mut PumpContext) {
    ctx.outputs = OutputCommands {
        crank: false,
        fuel: true,
    };
    info!("RUNNING: engine running, fuel held on");
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAILED state
// ═══════════════════════════════════════════════════════════════════════════

fn failed_enter(ctx: &mut PumpContext) {
    ctx.outputs = OutputCommands::all_off();
    warn!(
        "FAILED: start aborted after {} attempt(s), outputs off until reset",
        ctx.sequencer.attempt()
    );
}
