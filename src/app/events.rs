//! Outbound application events.
//!
//! The [`PumpService`](super::service::PumpService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them (serial log today).

use super::commands::{PumpCommand, Rejection};
use crate::fsm::PumpState;

/// Which kind of operator message went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    StartFailed,
    LowVoltage,
    VoltageRecovered,
    ServiceDue,
    WeeklyReport,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries initial state).
    Started(PumpState),

    /// The FSM transitioned between states.
    StateChanged { from: PumpState, to: PumpState },

    /// The starter was engaged.
    CrankAttempt { attempt: u8, max: u8 },

    /// A command was accepted and acted upon.
    CommandAccepted { command: PumpCommand },

    /// A command was refused; the originator got an explanatory reply.
    CommandRejected {
        command: PumpCommand,
        reason: Rejection,
    },

    /// A broadcast went to the alert address (or was dropped if none is set).
    AlertRaised { kind: AlertKind, delivered: bool },

    /// Engine run time was settled into the durable counter.
    RuntimeSettled { added_secs: u64, total_secs: u64 },

    /// The fail-safe had to override the requested outputs.
    FailSafeCorrected(PumpState),

    /// A durable write failed; state in RAM is still correct.
    PersistFailed(&'static str),
}
