//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::app::report::format_hours;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={}", state.label());
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from.label(), to.label());
            }
            AppEvent::CrankAttempt { attempt, max } => {
                info!("CRANK | attempt={}/{}", attempt, max);
            }
            AppEvent::CommandAccepted { command } => {
                info!("CMD   | accepted={}", command);
            }
            AppEvent::CommandRejected { command, reason } => {
                info!("CMD   | rejected={} | reason={}", command, reason.reply());
            }
            AppEvent::AlertRaised { kind, delivered } => {
                if *delivered {
                    info!("ALERT | kind={:?} | sent", kind);
                } else {
                    warn!("ALERT | kind={:?} | no alert address", kind);
                }
            }
            AppEvent::RuntimeSettled {
                added_secs,
                total_secs,
            } => {
                info!(
                    "HOURS | +{}s | total={}h",
                    added_secs,
                    format_hours(*total_secs)
                );
            }
            AppEvent::FailSafeCorrected(state) => {
                error!("SAFE  | outputs overridden in {}", state.label());
            }
            AppEvent::PersistFailed(what) => {
                error!("NVS   | persist failed: {}", what);
            }
        }
    }
}
